//! Step patterns: two independently timed parts, per-lane steps and
//! parameter-lock lanes.

use alloc::vec::Vec;

use crate::ids::{PatternId, NUM_PATTERNS, SLOTS_PER_BANK};
use crate::musical_time::nearest_resolution;
use crate::scale::Key;

/// Steps in a pattern (Part A + Part B).
pub const PATTERN_STEPS: usize = 32;

/// Steps in one part.
pub const PART_STEPS: usize = 16;

/// Note that maps to zero pitch offset.
pub const ROOT_NOTE: u8 = 60;

const LOCK_LANES: usize = 7;

/// Which half of the pattern is playing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Part {
    #[default]
    A,
    B,
}

impl Part {
    pub fn other(self) -> Self {
        match self {
            Part::A => Part::B,
            Part::B => Part::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Part::A => 0,
            Part::B => 1,
        }
    }

    /// First pattern step belonging to this part.
    pub fn step_offset(self) -> usize {
        self.index() * PART_STEPS
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 { Part::A } else { Part::B }
    }
}

/// Timing of one part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartConfig {
    /// Steps per whole note (16 = sixteenths).
    pub resolution: u8,
    /// Active steps, 1..=16.
    pub length: u8,
    /// Times the part plays before handing over, ≥ 1.
    pub repeats: u16,
}

impl Default for PartConfig {
    fn default() -> Self {
        Self { resolution: 16, length: PART_STEPS as u8, repeats: 1 }
    }
}

impl PartConfig {
    pub fn new(resolution: u8, length: u8, repeats: u16) -> Self {
        Self {
            resolution: nearest_resolution(resolution),
            length: length.clamp(1, PART_STEPS as u8),
            repeats: repeats.max(1),
        }
    }

    /// Step count, always in 1..=16 even if the field was set out of range.
    pub fn steps(&self) -> usize {
        (self.length as usize).clamp(1, PART_STEPS)
    }

    pub fn repeat_count(&self) -> u16 {
        self.repeats.max(1)
    }
}

/// One cell of a step lane.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub active: bool,
    /// Recorded note; becomes a pitch override relative to [`ROOT_NOTE`].
    pub note: Option<u8>,
    /// Recorded velocity 0..=127; becomes a volume override.
    pub velocity: Option<u8>,
}

/// Parameters that can be locked per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockParam {
    Pitch,
    Volume,
    Decay,
    Start,
    Lowpass,
    Highpass,
    Detune,
}

impl LockParam {
    pub const ALL: [LockParam; LOCK_LANES] = [
        LockParam::Pitch,
        LockParam::Volume,
        LockParam::Decay,
        LockParam::Start,
        LockParam::Lowpass,
        LockParam::Highpass,
        LockParam::Detune,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Per-trigger overrides. `None` fields fall back to the slot's live value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParamOverrides {
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub decay: Option<f32>,
    pub start: Option<f32>,
    pub lowpass: Option<f32>,
    pub highpass: Option<f32>,
    pub detune: Option<f32>,
}

impl ParamOverrides {
    pub fn get(&self, param: LockParam) -> Option<f32> {
        match param {
            LockParam::Pitch => self.pitch,
            LockParam::Volume => self.volume,
            LockParam::Decay => self.decay,
            LockParam::Start => self.start,
            LockParam::Lowpass => self.lowpass,
            LockParam::Highpass => self.highpass,
            LockParam::Detune => self.detune,
        }
    }

    pub fn set(&mut self, param: LockParam, value: Option<f32>) {
        let field = match param {
            LockParam::Pitch => &mut self.pitch,
            LockParam::Volume => &mut self.volume,
            LockParam::Decay => &mut self.decay,
            LockParam::Start => &mut self.start,
            LockParam::Lowpass => &mut self.lowpass,
            LockParam::Highpass => &mut self.highpass,
            LockParam::Detune => &mut self.detune,
        };
        *field = value;
    }

    pub fn is_empty(&self) -> bool {
        LockParam::ALL.iter().all(|&p| self.get(p).is_none())
    }
}

/// Steps and locks for one slot of the owning bank.
#[derive(Clone, Debug, PartialEq)]
pub struct Lane {
    pub steps: [Step; PATTERN_STEPS],
    locks: [[Option<f32>; PATTERN_STEPS]; LOCK_LANES],
}

impl Default for Lane {
    fn default() -> Self {
        Self {
            steps: [Step::default(); PATTERN_STEPS],
            locks: [[None; PATTERN_STEPS]; LOCK_LANES],
        }
    }
}

impl Lane {
    pub fn lock(&self, param: LockParam, step: usize) -> Option<f32> {
        self.locks[param.index()][step % PATTERN_STEPS]
    }

    pub fn set_lock(&mut self, param: LockParam, step: usize, value: Option<f32>) {
        self.locks[param.index()][step % PATTERN_STEPS] = value;
    }

    pub fn step(&self, step: usize) -> &Step {
        &self.steps[step % PATTERN_STEPS]
    }

    /// Overrides for a trigger at `step`. The step's note and velocity feed
    /// the same pitch/volume fields as the lock lanes; an explicit lock wins.
    pub fn overrides_at(&self, step: usize) -> ParamOverrides {
        let mut overrides = ParamOverrides::default();
        for param in LockParam::ALL {
            overrides.set(param, self.lock(param, step));
        }
        let cell = self.step(step);
        if overrides.pitch.is_none() {
            overrides.pitch = cell.note.map(|n| n as f32 - ROOT_NOTE as f32);
        }
        if overrides.volume.is_none() {
            overrides.volume = cell.velocity.map(|v| v.min(127) as f32 / 127.0);
        }
        overrides
    }
}

/// A 32-step, two-part pattern for one bank.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pattern {
    pub parts: [PartConfig; 2],
    pub key: Key,
    pub lanes: [Lane; SLOTS_PER_BANK],
}

impl Pattern {
    pub fn part(&self, part: Part) -> &PartConfig {
        &self.parts[part.index()]
    }

    pub fn part_mut(&mut self, part: Part) -> &mut PartConfig {
        &mut self.parts[part.index()]
    }

    pub fn lane(&self, lane: usize) -> &Lane {
        &self.lanes[lane % SLOTS_PER_BANK]
    }

    pub fn lane_mut(&mut self, lane: usize) -> &mut Lane {
        &mut self.lanes[lane % SLOTS_PER_BANK]
    }

    /// Flip a step on or off.
    pub fn toggle_step(&mut self, lane: usize, step: usize) {
        let cell = &mut self.lane_mut(lane).steps[step % PATTERN_STEPS];
        cell.active = !cell.active;
    }

    /// Enable a step with a live-played note, snapped to the pattern key.
    pub fn record_step(&mut self, lane: usize, step: usize, note: u8, velocity: u8) {
        let note = self.key.quantize(note);
        let cell = &mut self.lane_mut(lane).steps[step % PATTERN_STEPS];
        cell.active = true;
        cell.note = Some(note);
        cell.velocity = Some(velocity.min(127));
    }

    /// Activate every step of `part`'s active range in `lane`.
    pub fn fill_part(&mut self, lane: usize, part: Part) {
        let len = self.part(part).steps();
        let offset = part.step_offset();
        for cell in &mut self.lane_mut(lane).steps[offset..offset + len] {
            cell.active = true;
        }
    }
}

/// Fixed table of all 128 patterns.
#[derive(Clone, Debug)]
pub struct PatternTable {
    patterns: Vec<Pattern>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self {
            patterns: (0..NUM_PATTERNS).map(|_| Pattern::default()).collect(),
        }
    }

    pub fn get(&self, id: PatternId) -> &Pattern {
        &self.patterns[id.index()]
    }

    pub fn get_mut(&mut self, id: PatternId) -> &mut Pattern {
        &mut self.patterns[id.index()]
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new()
    }
}
