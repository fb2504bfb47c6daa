//! Audio clock sources.
//!
//! The lookahead scheduler never reads wall-clock time. It asks an
//! [`AudioClock`] how much audio has been rendered, so tests can substitute
//! a [`ManualClock`] and step time deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonic source of "now" on the audio timeline, in seconds.
pub trait AudioClock: Send + Sync {
    fn now(&self) -> f64;
}

impl<C: AudioClock + ?Sized> AudioClock for Arc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }
}

/// Frames rendered by the engine, shared between the render path (writer)
/// and the control path (readers).
#[derive(Clone, Debug)]
pub struct FrameClock {
    frames: Arc<AtomicU64>,
    sample_rate: u32,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Called by the render path after each block.
    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::Release);
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds_bits: AtomicU64,
}

impl ManualClock {
    pub fn new(seconds: f64) -> Self {
        Self { seconds_bits: AtomicU64::new(seconds.to_bits()) }
    }

    pub fn set(&self, seconds: f64) {
        self.seconds_bits.store(seconds.to_bits(), Ordering::Release);
    }

    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.seconds_bits.load(Ordering::Acquire))
    }
}

/// Convert seconds on the audio timeline to a frame index, rounding to the
/// nearest frame. Negative times map to frame 0.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}
