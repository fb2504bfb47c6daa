//! Core data model for the padloop sampler/sequencer.
//!
//! This crate defines the state the application owns and the engine
//! reads: sample slots, two-part step patterns with parameter locks,
//! grooves, keys, and the project snapshot that ties them together.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
pub mod groove;
mod ids;
mod musical_time;
mod pattern;
mod project;
mod sample;
mod scale;

pub use audio_buffer::{AudioBuffer, BLOCK_SIZE};
pub use groove::{offset_fraction, trigger_offset, Groove, GrooveId, GROOVES, GROOVE_STEPS};
pub use ids::{
    BankId, PatternId, SlotId, NUM_BANKS, NUM_PATTERNS, NUM_SLOTS, PATTERNS_PER_BANK, SLOTS_PER_BANK,
    SYNTH_BANK,
};
pub use musical_time::{nearest_resolution, sub_beats_per_step, MusicalTime, SUB_BEAT_UNIT, SUPPORTED_RESOLUTIONS};
pub use pattern::{
    Lane, LockParam, ParamOverrides, Part, PartConfig, Pattern, PatternTable, Step, PART_STEPS, PATTERN_STEPS,
    ROOT_NOTE,
};
pub use project::{BankSettings, CompressorSettings, EffectSpec, MasterSettings, Project, TEMPO_MAX, TEMPO_MIN};
pub use sample::{
    PlaybackDirection, SampleBuffer, SampleParams, SampleSlot, SlotTable, VoiceParams, CUTOFF_MAX, CUTOFF_MIN,
    PITCH_RANGE,
};
pub use scale::{Key, ScaleType};
