//! The shared tempo clock: single source of truth for converting musical
//! positions into seconds on the audio timeline.

use pl_ir::{sub_beats_per_step, MusicalTime, SUB_BEAT_UNIT, TEMPO_MAX, TEMPO_MIN};

/// Maps [`MusicalTime`] to audio-clock seconds through a tempo anchor.
///
/// A tempo change re-anchors at the current beat, so the beat playing at
/// the moment of the change keeps its time and everything after it moves
/// at the new rate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoClock {
    bpm: f64,
    anchor_seconds: f64,
    anchor_beat: MusicalTime,
}

impl TempoClock {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: bpm.clamp(TEMPO_MIN, TEMPO_MAX) as f64,
            anchor_seconds: 0.0,
            anchor_beat: MusicalTime::zero(),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Place beat zero at `at_seconds`.
    pub fn start(&mut self, at_seconds: f64) {
        self.anchor_seconds = at_seconds;
        self.anchor_beat = MusicalTime::zero();
    }

    pub fn seconds_at(&self, t: MusicalTime) -> f64 {
        self.anchor_seconds + (t.as_beats() - self.anchor_beat.as_beats()) * self.seconds_per_beat()
    }

    /// Fractional beat playing at `seconds`.
    pub fn beat_at(&self, seconds: f64) -> f64 {
        self.anchor_beat.as_beats() + (seconds - self.anchor_seconds) / self.seconds_per_beat()
    }

    /// Duration of one step at `resolution` steps per whole note.
    pub fn step_duration(&self, resolution: u8) -> f64 {
        sub_beats_per_step(resolution) as f64 / SUB_BEAT_UNIT as f64 * self.seconds_per_beat()
    }

    /// Change tempo from `now` onwards.
    pub fn set_bpm(&mut self, bpm: f32, now: f64) {
        let bpm = bpm.clamp(TEMPO_MIN, TEMPO_MAX) as f64;
        if bpm == self.bpm {
            return;
        }
        let beat = MusicalTime::from_beats_f64(self.beat_at(now));
        if beat > self.anchor_beat {
            self.anchor_seconds = self.seconds_at(beat);
            self.anchor_beat = beat;
        }
        self.bpm = bpm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteenth_at_120_bpm_is_125ms() {
        let clock = TempoClock::new(120.0);
        assert!((clock.step_duration(16) - 0.125).abs() < 1e-12);
        assert!((clock.step_duration(8) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn start_offsets_beat_zero() {
        let mut clock = TempoClock::new(120.0);
        clock.start(2.0);
        assert!((clock.seconds_at(MusicalTime::zero()) - 2.0).abs() < 1e-12);
        assert!((clock.seconds_at(MusicalTime::from_beats(4)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn tempo_change_reanchors_at_current_beat() {
        let mut clock = TempoClock::new(120.0);
        clock.start(0.0);
        clock.set_bpm(60.0, 1.5); // beat 3
        assert!((clock.seconds_at(MusicalTime::from_beats(3)) - 1.5).abs() < 1e-9);
        assert!((clock.seconds_at(MusicalTime::from_beats(4)) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn tempo_is_clamped() {
        let clock = TempoClock::new(5000.0);
        assert_eq!(clock.bpm(), TEMPO_MAX as f64);
    }

    #[test]
    fn beat_at_inverts_seconds_at() {
        let mut clock = TempoClock::new(90.0);
        clock.start(0.3);
        let t = MusicalTime::zero().add_steps(11, 16);
        let secs = clock.seconds_at(t);
        assert!((clock.beat_at(secs) - t.as_beats()).abs() < 1e-9);
    }
}
