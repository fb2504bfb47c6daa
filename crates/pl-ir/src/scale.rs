//! Musical keys used to quantize recorded pitches.

/// Scale shapes a pattern can be keyed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleType {
    #[default]
    Chromatic,
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    HarmonicMinor,
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    WholeTone,
}

impl ScaleType {
    /// Semitone intervals from the root, ascending, within one octave.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleType::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleType::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            ScaleType::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleType::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::WholeTone => &[0, 2, 4, 6, 8, 10],
        }
    }
}

/// Root pitch class (0 = C) plus scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Key {
    pub root: u8,
    pub scale: ScaleType,
}

impl Key {
    pub fn new(root: u8, scale: ScaleType) -> Self {
        Self { root: root % 12, scale }
    }

    pub fn contains(&self, note: u8) -> bool {
        let pc = (note as i16 - self.root as i16).rem_euclid(12) as u8;
        self.scale.intervals().contains(&pc)
    }

    /// Nearest in-key MIDI note. Ties resolve downwards.
    pub fn quantize(&self, note: u8) -> u8 {
        let note = note.min(127) as i16;
        for distance in 0..12i16 {
            for candidate in [note - distance, note + distance] {
                if (0..=127).contains(&candidate) && self.contains(candidate as u8) {
                    return candidate as u8;
                }
            }
        }
        note as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chromatic_keeps_every_note() {
        let key = Key::default();
        for n in 0..128u8 {
            assert_eq!(key.quantize(n), n);
        }
    }

    #[test]
    fn c_major_snaps_black_keys_down() {
        let key = Key::new(0, ScaleType::Major);
        assert_eq!(key.quantize(61), 60); // C# -> C
        assert_eq!(key.quantize(63), 62); // D# -> D
        assert_eq!(key.quantize(64), 64);
    }

    #[test]
    fn root_shifts_scale() {
        let key = Key::new(2, ScaleType::MinorPentatonic); // D F G A C
        assert!(key.contains(62));
        assert!(key.contains(65));
        assert!(!key.contains(64));
        assert_eq!(key.quantize(64), 65);
    }

    #[test]
    fn root_wraps_to_pitch_class() {
        assert_eq!(Key::new(14, ScaleType::Major).root, 2);
    }
}
