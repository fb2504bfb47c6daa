//! Fixed library of groove templates.
//!
//! A groove is 16 per-step timing offsets, each a signed fraction of one
//! step's duration, applied cyclically. A bank scales its groove by a depth
//! in −1..1, so a negative depth inverts the feel.

/// Offsets per groove cycle.
pub const GROOVE_STEPS: usize = 16;

/// Index into [`GROOVES`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GrooveId(pub u8);

/// A named timing template.
#[derive(Debug)]
pub struct Groove {
    pub name: &'static str,
    pub offsets: [f32; GROOVE_STEPS],
}

const fn swing(amount: f32) -> [f32; GROOVE_STEPS] {
    let mut offsets = [0.0; GROOVE_STEPS];
    let mut i = 1;
    while i < GROOVE_STEPS {
        offsets[i] = amount;
        i += 2;
    }
    offsets
}

/// The groove library. Id 0 is always straight time.
pub static GROOVES: [Groove; 9] = [
    Groove { name: "Straight", offsets: [0.0; GROOVE_STEPS] },
    Groove { name: "Swing 54", offsets: swing(0.08) },
    Groove { name: "Swing 58", offsets: swing(0.16) },
    Groove { name: "Swing 62", offsets: swing(0.24) },
    Groove { name: "Triplet Swing", offsets: swing(1.0 / 3.0) },
    Groove {
        name: "Shuffle 8ths",
        offsets: [
            0.0, 0.0, 0.66, 0.0, 0.0, 0.0, 0.66, 0.0,
            0.0, 0.0, 0.66, 0.0, 0.0, 0.0, 0.66, 0.0,
        ],
    },
    Groove { name: "Push", offsets: swing(-0.12) },
    Groove {
        name: "Laid Back",
        offsets: [
            0.0, 0.10, 0.05, 0.15, 0.02, 0.12, 0.06, 0.18,
            0.0, 0.10, 0.05, 0.15, 0.02, 0.12, 0.06, 0.20,
        ],
    },
    Groove {
        name: "Humanize",
        offsets: [
            0.0, 0.06, -0.04, 0.03, -0.02, 0.05, -0.06, 0.02,
            0.01, -0.05, 0.04, -0.03, 0.02, 0.07, -0.01, -0.04,
        ],
    },
];

/// Look up a groove; unknown ids have none.
pub fn groove(id: GrooveId) -> Option<&'static Groove> {
    GROOVES.get(id.0 as usize)
}

/// Offset of `step` as a fraction of a step, in −1..1. Unknown grooves
/// contribute no offset.
pub fn offset_fraction(id: GrooveId, step: usize) -> f32 {
    groove(id).map_or(0.0, |g| g.offsets[step % GROOVE_STEPS].clamp(-1.0, 1.0))
}

/// Seconds to add to a step's nominal time.
pub fn trigger_offset(id: GrooveId, step: usize, step_duration: f64, depth: f32) -> f64 {
    let fraction = offset_fraction(id, step) * depth.clamp(-1.0, 1.0);
    fraction as f64 * step_duration
}
