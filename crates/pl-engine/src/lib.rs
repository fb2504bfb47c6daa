//! Scheduling, voice rendering and mixing for padloop.
//!
//! The crate is split along the thread boundary:
//!
//! - Control side: [`Sequencer`] (lookahead scheduling over per-bank
//!   [`TrackScheduler`]s), [`VoiceRenderer`] (voice planning),
//!   [`ParamSync`] (mixer diffs) and [`LevelRecorder`] (input capture).
//! - Render side: [`Engine`], which owns the [`VoicePool`] and the
//!   [`MixGraph`] and never allocates, locks or blocks.
//!
//! The two sides talk only through [`EngineCommand`]s, the shared
//! [`FrameClock`] and the [`EngineStats`] counters.

mod clock;
mod commands;
mod dynamics;
pub mod effects;
mod engine;
mod envelope;
mod event_queue;
mod filter;
pub mod frequency;
mod mixer;
mod param_sync;
mod recorder;
mod renderer;
mod scheduler;
mod sequencer;
mod smoothing;
mod stats;
mod tempo;
mod voice;
mod voice_pool;

pub use clock::{seconds_to_frames, AudioClock, FrameClock, ManualClock};
pub use commands::{CommandSink, EngineCommand, Garbage, Ramp};
pub use dynamics::Compressor;
pub use effects::{create_chain, create_effect, Effect, EffectInfo};
pub use engine::{Engine, EngineHandle, EngineSettings};
pub use envelope::EnvelopePlan;
pub use event_queue::EventQueue;
pub use filter::{FilterSpec, StereoFilter};
pub use mixer::{pan_gains, BankStrip, MixGraph};
pub use param_sync::ParamSync;
pub use recorder::{LevelRecorder, RecorderSettings, RecorderState};
pub use renderer::{RenderSettings, VoiceRenderer};
pub use scheduler::{ScheduleContext, TrackPosition, TrackScheduler, TrackSnapshot, TrackState, TrackStatus};
pub use sequencer::{SchedulerSettings, Sequencer};
pub use smoothing::SmoothedParam;
pub use stats::EngineStats;
pub use tempo::TempoClock;
pub use voice::{TriggerOrigin, Voice, VoiceHandle, VoicePlan, VoiceSource, Waveform};
pub use voice_pool::{VoiceKey, VoicePool, MAX_VOICES, STEAL_HEADROOM};
