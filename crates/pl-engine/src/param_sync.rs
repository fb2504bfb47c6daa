//! Pushes mixer-relevant project changes to the engine as smoothed ramps.
//!
//! The project is compared against the last snapshot sent; only fields that
//! changed produce commands. Pattern edits need no sync at all, since the
//! scheduler reads them straight from the project.

use pl_ir::{BankId, CompressorSettings, EffectSpec, Project, SlotId, NUM_BANKS, NUM_SLOTS};
use tracing::debug;

use crate::commands::{CommandSink, EngineCommand, Ramp};
use crate::effects::create_chain;
use crate::frequency::semitones_to_cents;

#[derive(Clone, Debug, PartialEq)]
struct MixSnapshot {
    slot_volume: [f32; NUM_SLOTS],
    slot_pitch: [f32; NUM_SLOTS],
    bank_volume: [f32; NUM_BANKS],
    bank_pan: [f32; NUM_BANKS],
    bank_mute: [bool; NUM_BANKS],
    bank_solo: [bool; NUM_BANKS],
    master_volume: f32,
    compressor: CompressorSettings,
    effects: Vec<EffectSpec>,
}

impl MixSnapshot {
    fn capture(project: &Project) -> Self {
        let slot = |f: fn(&pl_ir::SampleParams) -> f32| -> [f32; NUM_SLOTS] {
            core::array::from_fn(|i| f(&project.slots.get(SlotId::new(i)).params.clamped()))
        };
        Self {
            slot_volume: slot(|p| p.volume),
            slot_pitch: slot(|p| semitones_to_cents(p.pitch)),
            bank_volume: project.banks.map(|b| b.volume.clamp(0.0, 1.0)),
            bank_pan: project.banks.map(|b| b.pan.clamp(-1.0, 1.0)),
            bank_mute: project.banks.map(|b| b.mute),
            bank_solo: project.banks.map(|b| b.solo),
            master_volume: project.master.volume.clamp(0.0, 1.0),
            compressor: project.master.compressor,
            effects: project.master.effects.clone(),
        }
    }
}

/// Diffs successive project snapshots into engine commands.
pub struct ParamSync {
    previous: Option<MixSnapshot>,
    ramp_frames: u32,
    sample_rate: u32,
}

impl ParamSync {
    pub fn new(ramp_frames: u32, sample_rate: u32) -> Self {
        Self { previous: None, ramp_frames, sample_rate }
    }

    /// Forget the last snapshot so the next sync sends everything.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Send commands for everything that differs from the last sync. The
    /// first sync after construction or [`reset`](Self::reset) sets every
    /// value without ramping. Returns the number of commands sent.
    pub fn sync<S: CommandSink + ?Sized>(&mut self, project: &Project, at_frame: u64, sink: &mut S) -> usize {
        let next = MixSnapshot::capture(project);
        let (prev, frames) = match &self.previous {
            Some(prev) if *prev == next => return 0,
            Some(prev) => (Some(prev), self.ramp_frames),
            None => (None, 0),
        };
        let mut sent = 0;
        let mut emit = |command: EngineCommand| {
            sink.send(command);
            sent += 1;
        };
        let ramp = |target: f32| Ramp::new(target, at_frame, frames);
        let changed = |old: Option<f32>, new: f32| old.map_or(true, |o| o != new);

        for slot in SlotId::all() {
            let i = slot.index();
            if changed(prev.map(|p| p.slot_volume[i]), next.slot_volume[i]) {
                emit(EngineCommand::SlotGain(slot, ramp(next.slot_volume[i])));
            }
            if changed(prev.map(|p| p.slot_pitch[i]), next.slot_pitch[i]) {
                emit(EngineCommand::SlotPitch(slot, ramp(next.slot_pitch[i])));
            }
        }
        for bank in BankId::all() {
            let b = bank.index();
            if changed(prev.map(|p| p.bank_volume[b]), next.bank_volume[b]) {
                emit(EngineCommand::BankGain(bank, ramp(next.bank_volume[b])));
            }
            if changed(prev.map(|p| p.bank_pan[b]), next.bank_pan[b]) {
                emit(EngineCommand::BankPan(bank, ramp(next.bank_pan[b])));
            }
            if prev.map_or(true, |p| p.bank_mute[b] != next.bank_mute[b]) {
                emit(EngineCommand::BankMute(bank, next.bank_mute[b]));
            }
            if prev.map_or(true, |p| p.bank_solo[b] != next.bank_solo[b]) {
                emit(EngineCommand::BankSolo(bank, next.bank_solo[b]));
            }
        }
        if changed(prev.map(|p| p.master_volume), next.master_volume) {
            emit(EngineCommand::MasterGain(ramp(next.master_volume)));
        }
        if prev.map_or(true, |p| p.compressor != next.compressor) {
            emit(EngineCommand::Compressor(next.compressor));
        }
        if prev.map_or(true, |p| p.effects != next.effects) {
            emit(EngineCommand::Effects(create_chain(&next.effects, self.sample_rate)));
        }

        debug!(commands = sent, "mixer sync");
        self.previous = Some(next);
        sent
    }
}
