//! Amplitude envelope of a triggered voice.
//!
//! Times are absolute frame indices on the engine timeline, computed once
//! when the voice is prepared. The render path only evaluates them.

/// Linear ramp-up, plateau, linear release. When the audible window is too
/// short for both ramps, `peak == release` and the plateau disappears: the
/// gain rises and immediately falls back to zero at `stop`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvelopePlan {
    pub start: u64,
    pub peak: u64,
    pub release: u64,
    pub stop: u64,
}

impl EnvelopePlan {
    pub fn new(start: u64, stop: u64, ramp_frames: u64, release_frames: u64) -> Self {
        let stop = stop.max(start);
        let window = stop - start;
        if window >= ramp_frames + release_frames {
            return Self {
                start,
                peak: start + ramp_frames,
                release: stop - release_frames,
                stop,
            };
        }
        let total = ramp_frames + release_frames;
        let rise = if total == 0 { window / 2 } else { window * ramp_frames / total };
        let turn = start + rise;
        Self { start, peak: turn, release: turn, stop }
    }

    /// True if the envelope holds full gain for at least one frame.
    pub fn has_plateau(&self) -> bool {
        self.release > self.peak
    }

    /// Gain at an absolute frame.
    #[inline]
    pub fn gain_at(&self, frame: u64) -> f32 {
        if frame < self.start || frame >= self.stop {
            0.0
        } else if frame < self.peak {
            (frame - self.start) as f32 / (self.peak - self.start) as f32
        } else if frame < self.release {
            1.0
        } else {
            (self.stop - frame) as f32 / (self.stop - self.release) as f32
        }
    }
}
