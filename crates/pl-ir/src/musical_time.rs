//! Beat-based time representation.
//!
//! `MusicalTime` is the exact coordinate every pattern track advances in.
//! Tracks running at different step resolutions stay phase-locked because
//! they all count in whole sub-beat units and only convert to seconds
//! through the shared tempo clock.

/// Subdivisions per beat. LCM(1..16) = 720720, so every step resolution
/// in [`SUPPORTED_RESOLUTIONS`] maps to a whole number of sub-beats.
pub const SUB_BEAT_UNIT: u32 = 720_720;

/// Step resolutions (steps per whole note) a pattern part may use.
pub const SUPPORTED_RESOLUTIONS: [u8; 12] = [1, 2, 3, 4, 6, 8, 12, 16, 24, 32, 48, 64];

/// A position in musical time (beats + fractional sub-beat).
///
/// Ordering: beat is primary, sub_beat is secondary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MusicalTime {
    /// Whole beats from transport start
    pub beat: u64,
    /// Fraction of a beat: 0..SUB_BEAT_UNIT
    pub sub_beat: u32,
}

impl MusicalTime {
    /// The zero position (transport start).
    pub const fn zero() -> Self {
        Self { beat: 0, sub_beat: 0 }
    }

    /// Create a time at an exact beat boundary.
    pub const fn from_beats(beat: u64) -> Self {
        Self { beat, sub_beat: 0 }
    }

    /// The position at or just before a fractional beat count.
    /// Negative inputs clamp to zero.
    pub fn from_beats_f64(beats: f64) -> Self {
        if beats <= 0.0 {
            return Self::zero();
        }
        let whole = libm::floor(beats);
        let frac = ((beats - whole) * SUB_BEAT_UNIT as f64) as u32;
        Self {
            beat: whole as u64,
            sub_beat: frac.min(SUB_BEAT_UNIT - 1),
        }
    }

    /// This position as a fractional beat count.
    pub fn as_beats(self) -> f64 {
        self.beat as f64 + self.sub_beat as f64 / SUB_BEAT_UNIT as f64
    }

    /// Advance by `steps` steps at `resolution` steps per whole note.
    pub fn add_steps(self, steps: u32, resolution: u8) -> Self {
        let total_sub = self.sub_beat as u64 + steps as u64 * sub_beats_per_step(resolution);
        let extra_beats = total_sub / SUB_BEAT_UNIT as u64;
        let remaining = (total_sub % SUB_BEAT_UNIT as u64) as u32;
        Self {
            beat: self.beat + extra_beats,
            sub_beat: remaining,
        }
    }
}

impl PartialOrd for MusicalTime {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MusicalTime {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.beat.cmp(&other.beat).then(self.sub_beat.cmp(&other.sub_beat))
    }
}

/// Snap an arbitrary resolution to the nearest supported one.
pub fn nearest_resolution(resolution: u8) -> u8 {
    SUPPORTED_RESOLUTIONS
        .iter()
        .copied()
        .min_by_key(|&r| (r as i16 - resolution as i16).abs())
        .unwrap_or(16)
}

/// Length of one step in sub-beats. A beat is a quarter note, so a step at
/// resolution `r` lasts `4 / r` beats.
pub fn sub_beats_per_step(resolution: u8) -> u64 {
    let resolution = nearest_resolution(resolution) as u64;
    4 * SUB_BEAT_UNIT as u64 / resolution
}
