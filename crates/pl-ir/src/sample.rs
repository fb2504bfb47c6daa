//! Sample slots, their playback parameters, and decoded audio buffers.

use alloc::sync::Arc;
use alloc::vec::Vec;
use arrayvec::ArrayString;

use crate::ids::{SlotId, NUM_SLOTS};
use crate::pattern::ParamOverrides;

/// Lowest allowed filter cutoff in Hz.
pub const CUTOFF_MIN: f32 = 20.0;

/// Highest allowed filter cutoff in Hz.
pub const CUTOFF_MAX: f32 = 20_000.0;

/// Pitch range in semitones either side of the original.
pub const PITCH_RANGE: f32 = 24.0;

/// Decoded audio, stored planar as f32. Mono material is duplicated into
/// both channels so voices always read stereo.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn mono(data: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            right: data.clone(),
            left: data,
            sample_rate,
        }
    }

    /// Build from two channels; the longer one is truncated to match.
    pub fn stereo(mut left: Vec<f32>, mut right: Vec<f32>, sample_rate: u32) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self { left, right, sample_rate }
    }

    /// Split interleaved data with `channels` channels. Channels beyond the
    /// second are dropped.
    pub fn from_interleaved(data: &[f32], channels: usize, sample_rate: u32) -> Self {
        match channels {
            0 => Self { left: Vec::new(), right: Vec::new(), sample_rate },
            1 => Self::mono(data.to_vec(), sample_rate),
            _ => {
                let frames = data.len() / channels;
                let mut left = Vec::with_capacity(frames);
                let mut right = Vec::with_capacity(frames);
                for frame in data.chunks_exact(channels) {
                    left.push(frame[0]);
                    right.push(frame[1]);
                }
                Self { left, right, sample_rate }
            }
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Length in seconds at the buffer's native rate.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Stereo frame at `index`, silence past the end.
    pub fn frame(&self, index: usize) -> (f32, f32) {
        match (self.left.get(index), self.right.get(index)) {
            (Some(&l), Some(&r)) => (l, r),
            _ => (0.0, 0.0),
        }
    }

    /// Linearly interpolated stereo frame at a fractional position.
    pub fn frame_interpolated(&self, position: f64) -> (f32, f32) {
        if position < 0.0 {
            return (0.0, 0.0);
        }
        let index = position as usize;
        let frac = (position - index as f64) as f32;
        let (l0, r0) = self.frame(index);
        if frac == 0.0 {
            return (l0, r0);
        }
        let (l1, r1) = self.frame(index + 1);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }

    /// Largest absolute sample value across both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0f32, |acc, &s| acc.max(libm::fabsf(s)))
    }
}

/// Direction a voice reads its buffer in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackDirection {
    #[default]
    Forward,
    Reverse,
    /// Forward to the end, then back towards the start offset.
    PingPong,
}

/// Live playback parameters of a slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleParams {
    /// Semitones, −24..24.
    pub pitch: f32,
    /// 0..1.
    pub volume: f32,
    /// Start offset as a fraction of the buffer.
    pub start: f32,
    /// Fraction of the remaining buffer after `start` that plays.
    pub decay: f32,
    pub looping: bool,
    pub direction: PlaybackDirection,
    /// Low-pass cutoff in Hz.
    pub lowpass: f32,
    /// High-pass cutoff in Hz.
    pub highpass: f32,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            volume: 0.8,
            start: 0.0,
            decay: 1.0,
            looping: false,
            direction: PlaybackDirection::Forward,
            lowpass: CUTOFF_MAX,
            highpass: CUTOFF_MIN,
        }
    }
}

impl SampleParams {
    /// Copy with every field forced into its legal range.
    pub fn clamped(self) -> Self {
        Self {
            pitch: self.pitch.clamp(-PITCH_RANGE, PITCH_RANGE),
            volume: self.volume.clamp(0.0, 1.0),
            start: self.start.clamp(0.0, 1.0),
            decay: self.decay.clamp(0.0, 1.0),
            lowpass: self.lowpass.clamp(CUTOFF_MIN, CUTOFF_MAX),
            highpass: self.highpass.clamp(CUTOFF_MIN, CUTOFF_MAX),
            ..self
        }
    }

    /// Resolve the parameters a single trigger plays with: each override
    /// replaces the live value for that field only.
    pub fn resolve(&self, overrides: &ParamOverrides) -> VoiceParams {
        let live = self.clamped();
        VoiceParams {
            pitch: overrides.pitch.map_or(live.pitch, |p| p.clamp(-PITCH_RANGE, PITCH_RANGE)),
            pitch_locked: overrides.pitch.is_some(),
            detune: overrides.detune.unwrap_or(0.0).clamp(-100.0, 100.0),
            gain_lock: overrides.volume.map(|v| v.clamp(0.0, 1.0)),
            start: overrides.start.map_or(live.start, |s| s.clamp(0.0, 1.0)),
            decay: overrides.decay.map_or(live.decay, |d| d.clamp(0.0, 1.0)),
            looping: live.looping,
            direction: live.direction,
            lowpass: overrides.lowpass.map_or(live.lowpass, |f| f.clamp(CUTOFF_MIN, CUTOFF_MAX)),
            highpass: overrides.highpass.map_or(live.highpass, |f| f.clamp(CUTOFF_MIN, CUTOFF_MAX)),
        }
    }
}

/// Parameters of one trigger after locks are applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParams {
    pub pitch: f32,
    /// True when `pitch` came from a lock; such voices ignore live pitch ramps.
    pub pitch_locked: bool,
    /// Extra cents on top of `pitch`.
    pub detune: f32,
    /// Voice gain replacing the slot bus gain, when a volume lock is present.
    pub gain_lock: Option<f32>,
    pub start: f32,
    pub decay: f32,
    pub looping: bool,
    pub direction: PlaybackDirection,
    pub lowpass: f32,
    pub highpass: f32,
}

impl VoiceParams {
    /// Total detune in cents.
    pub fn cents(&self) -> f32 {
        self.pitch * 100.0 + self.detune
    }
}

/// One of the 32 pads.
#[derive(Clone, Debug, Default)]
pub struct SampleSlot {
    pub name: ArrayString<32>,
    /// Replaced wholesale by load/record; voices hold their own reference.
    pub buffer: Option<Arc<SampleBuffer>>,
    pub params: SampleParams,
}

impl SampleSlot {
    pub fn has_buffer(&self) -> bool {
        self.buffer.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Set the display name, truncated to capacity.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for c in name.chars() {
            if self.name.try_push(c).is_err() {
                break;
            }
        }
    }
}

/// All 32 slots, indexed by [`SlotId`].
#[derive(Clone, Debug)]
pub struct SlotTable {
    slots: [SampleSlot; NUM_SLOTS],
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| SampleSlot::default()),
        }
    }

    pub fn get(&self, id: SlotId) -> &SampleSlot {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut SampleSlot {
        &mut self.slots[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &SampleSlot)> {
        self.slots.iter().enumerate().map(|(i, s)| (SlotId::new(i), s))
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}
