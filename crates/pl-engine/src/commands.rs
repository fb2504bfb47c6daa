//! Messages from the control path to the render path, and the garbage that
//! travels back.

use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use pl_ir::{BankId, CompressorSettings, SampleBuffer, SlotId};
use ringbuf::HeapProd;
use tracing::warn;

use crate::effects::Effect;
use crate::voice::VoicePlan;

/// A linear move to `target` that begins at frame `at` and lasts `frames`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ramp {
    pub target: f32,
    pub at: u64,
    pub frames: u32,
}

impl Ramp {
    pub fn new(target: f32, at: u64, frames: u32) -> Self {
        Self { target, at, frames }
    }
}

/// One instruction for the engine.
pub enum EngineCommand {
    /// Start a voice at the plan's start frame.
    StartVoice(VoicePlan),
    SlotGain(SlotId, Ramp),
    /// Target is the slot pitch in cents.
    SlotPitch(SlotId, Ramp),
    BankGain(BankId, Ramp),
    BankPan(BankId, Ramp),
    BankMute(BankId, bool),
    BankSolo(BankId, bool),
    MasterGain(Ramp),
    Compressor(CompressorSettings),
    /// Replace the master effects chain.
    Effects(Vec<Box<dyn Effect>>),
    /// Attach or detach the output tap.
    Tap(Option<HeapProd<f32>>),
    /// Drop every sequencer trigger that has not started yet.
    CancelPending,
}

impl EngineCommand {
    /// Frame the command takes effect at; `None` applies on receipt.
    pub fn due_frame(&self) -> Option<u64> {
        match self {
            EngineCommand::StartVoice(plan) => Some(plan.envelope.start),
            EngineCommand::SlotGain(_, ramp)
            | EngineCommand::SlotPitch(_, ramp)
            | EngineCommand::BankGain(_, ramp)
            | EngineCommand::BankPan(_, ramp)
            | EngineCommand::MasterGain(ramp) => Some(ramp.at),
            _ => None,
        }
    }
}

impl core::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EngineCommand::StartVoice(plan) => f.debug_tuple("StartVoice").field(&plan.handle()).finish(),
            EngineCommand::SlotGain(slot, ramp) => f.debug_tuple("SlotGain").field(slot).field(ramp).finish(),
            EngineCommand::SlotPitch(slot, ramp) => f.debug_tuple("SlotPitch").field(slot).field(ramp).finish(),
            EngineCommand::BankGain(bank, ramp) => f.debug_tuple("BankGain").field(bank).field(ramp).finish(),
            EngineCommand::BankPan(bank, ramp) => f.debug_tuple("BankPan").field(bank).field(ramp).finish(),
            EngineCommand::BankMute(bank, on) => f.debug_tuple("BankMute").field(bank).field(on).finish(),
            EngineCommand::BankSolo(bank, on) => f.debug_tuple("BankSolo").field(bank).field(on).finish(),
            EngineCommand::MasterGain(ramp) => f.debug_tuple("MasterGain").field(ramp).finish(),
            EngineCommand::Compressor(settings) => f.debug_tuple("Compressor").field(settings).finish(),
            EngineCommand::Effects(chain) => write!(f, "Effects({} stages)", chain.len()),
            EngineCommand::Tap(tap) => write!(f, "Tap({})", tap.is_some()),
            EngineCommand::CancelPending => f.write_str("CancelPending"),
        }
    }
}

/// Anything that accepts engine commands: the live channel, or a plain
/// `Vec` in tests.
pub trait CommandSink {
    fn send(&mut self, command: EngineCommand);
}

impl CommandSink for Vec<EngineCommand> {
    fn send(&mut self, command: EngineCommand) {
        self.push(command);
    }
}

impl CommandSink for Sender<EngineCommand> {
    fn send(&mut self, command: EngineCommand) {
        match self.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => warn!(?command, "engine command queue full, dropping"),
            Err(TrySendError::Disconnected(_)) => warn!("engine is gone, dropping command"),
        }
    }
}

/// Resources the render path is finished with. Freed on the receiving
/// side so deallocation never happens inside the audio callback.
pub enum Garbage {
    Buffer(Arc<SampleBuffer>),
    Effects(Vec<Box<dyn Effect>>),
    Tap(HeapProd<f32>),
    Command(EngineCommand),
}

impl core::fmt::Debug for Garbage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Garbage::Buffer(buffer) => write!(f, "Buffer({} frames)", buffer.frames()),
            Garbage::Effects(chain) => write!(f, "Effects({} stages)", chain.len()),
            Garbage::Tap(_) => f.write_str("Tap"),
            Garbage::Command(command) => f.debug_tuple("Command").field(command).finish(),
        }
    }
}
