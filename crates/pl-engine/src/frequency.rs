//! Pitch conversions for sample playback and the synth voice.

/// A4 in Hz.
const A4_HZ: f64 = 440.0;

/// MIDI note number of A4.
const A4_NOTE: f64 = 69.0;

/// Cents for a semitone offset.
pub fn semitones_to_cents(semitones: f32) -> f32 {
    semitones * 100.0
}

/// Frequency ratio for a detune in cents.
pub fn cents_to_ratio(cents: f32) -> f64 {
    (cents as f64 / 1200.0).exp2()
}

/// Equal-tempered frequency of a (fractional) MIDI note.
pub fn note_to_hz(note: f64) -> f64 {
    A4_HZ * ((note - A4_NOTE) / 12.0).exp2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cents_is_unity() {
        assert!((cents_to_ratio(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn octave_doubles_and_halves() {
        assert!((cents_to_ratio(semitones_to_cents(12.0)) - 2.0).abs() < 1e-9);
        assert!((cents_to_ratio(semitones_to_cents(-12.0)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn semitone_up_is_twelfth_root_of_two() {
        assert!((cents_to_ratio(100.0) - 1.059463).abs() < 1e-6);
    }

    #[test]
    fn a4_and_middle_c() {
        assert!((note_to_hz(69.0) - 440.0).abs() < 1e-9);
        assert!((note_to_hz(60.0) - 261.6256).abs() < 1e-3);
    }
}
