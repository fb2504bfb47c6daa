//! The render context: owns the voices and the mix graph and turns queued
//! commands into audio, one block at a time.
//!
//! Everything here runs on the audio callback. Commands arrive over a
//! bounded channel, timed commands wait in a preallocated queue, and any
//! resource that must be freed is sent back over the garbage channel.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use pl_ir::{AudioBuffer, BLOCK_SIZE};

use crate::clock::FrameClock;
use crate::commands::{EngineCommand, Garbage};
use crate::event_queue::EventQueue;
use crate::mixer::MixGraph;
use crate::stats::EngineStats;
use crate::voice::{TriggerOrigin, Voice};
use crate::voice_pool::VoicePool;

/// Sizing of the engine's channels and queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub sample_rate: u32,
    /// Bound of the command channel and of the timed queue.
    pub queue_capacity: usize,
    /// Bound of the garbage channel.
    pub garbage_capacity: usize,
}

impl EngineSettings {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, queue_capacity: 1024, garbage_capacity: 1024 }
    }
}

/// Control-side ends of the engine's channels.
#[derive(Clone, Debug)]
pub struct EngineHandle {
    pub commands: Sender<EngineCommand>,
    pub garbage: Receiver<Garbage>,
    pub clock: FrameClock,
    pub stats: Arc<EngineStats>,
}

impl EngineHandle {
    /// Drop everything the render path has handed back. Returns how many
    /// items were freed.
    pub fn collect_garbage(&self) -> usize {
        self.garbage.try_iter().count()
    }
}

pub struct Engine {
    sample_rate: u32,
    clock: FrameClock,
    commands: Receiver<EngineCommand>,
    garbage: Sender<Garbage>,
    queue: EventQueue,
    pool: VoicePool,
    mixer: MixGraph,
    stats: Arc<EngineStats>,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> (Self, EngineHandle) {
        let sample_rate = settings.sample_rate.max(1);
        let (command_tx, command_rx) = crossbeam_channel::bounded(settings.queue_capacity.max(1));
        let (garbage_tx, garbage_rx) = crossbeam_channel::bounded(settings.garbage_capacity.max(1));
        let clock = FrameClock::new(sample_rate);
        let stats = Arc::new(EngineStats::new());
        let engine = Self {
            sample_rate,
            clock: clock.clone(),
            commands: command_rx,
            garbage: garbage_tx,
            queue: EventQueue::with_capacity(settings.queue_capacity),
            pool: VoicePool::new(sample_rate),
            mixer: MixGraph::new(sample_rate),
            stats: Arc::clone(&stats),
        };
        let handle = EngineHandle { commands: command_tx, garbage: garbage_rx, clock, stats };
        (engine, handle)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn mixer(&self) -> &MixGraph {
        &self.mixer
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Render up to [`BLOCK_SIZE`] frames and advance the clock.
    pub fn render_block(&mut self, frames: usize) -> &AudioBuffer {
        let frames = frames.min(BLOCK_SIZE);
        let started = Instant::now();
        let block_start = self.clock.frames();
        let block_end = block_start + frames as u64;

        self.drain_commands();
        while let Some(command) = self.queue.pop_before(block_end) {
            self.apply(command);
        }

        self.mixer.clear();
        let (slot_buses, direct_buses) = self.mixer.voice_buses();
        self.pool.render(block_start, frames, slot_buses, direct_buses);
        let garbage = &self.garbage;
        self.pool.reap_finished(|voice| discard_voice(garbage, voice));
        self.mixer.mix(frames);

        self.clock.advance(frames as u64);
        let budget = frames as f64 / self.sample_rate as f64;
        let load = if budget > 0.0 { started.elapsed().as_secs_f64() / budget } else { 0.0 };
        self.stats.publish(self.pool.active_count(), self.pool.slot_counts(), load as f32);
        self.mixer.output()
    }

    /// Fill an interleaved device buffer with `channels` channels.
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for chunk in out.chunks_mut(BLOCK_SIZE * channels) {
            let frames = chunk.len() / channels;
            let block = self.render_block(frames);
            block.write_interleaved(chunk, channels, frames);
        }
    }

    /// [`render_interleaved`](Self::render_interleaved), checked for heap
    /// activity when built with `alloc_check`.
    pub fn process(&mut self, out: &mut [f32], channels: usize) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.render_interleaved(out, channels));
        #[cfg(not(feature = "alloc_check"))]
        self.render_interleaved(out, channels);
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command.due_frame() {
                None => self.apply(command),
                Some(frame) => {
                    if let Err(command) = self.queue.push(frame, command) {
                        self.stats.record_overflow();
                        self.apply(command);
                    }
                }
            }
        }
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::StartVoice(plan) => {
                let (_, stolen) = self.pool.start(plan);
                if let Some(voice) = stolen {
                    discard_voice(&self.garbage, voice);
                }
            }
            EngineCommand::SlotGain(slot, ramp) => self.mixer.slot_gain_mut(slot).ramp_to(ramp.target, ramp.frames),
            EngineCommand::SlotPitch(slot, ramp) => {
                self.pool.ramp_slot_pitch(slot, ramp.target, ramp.frames);
                // Voices already planned but not yet started take the new pitch.
                self.queue.for_each_mut(|queued| {
                    if let EngineCommand::StartVoice(plan) = queued {
                        if plan.slot == slot && !plan.pitch_locked {
                            plan.pitch_cents = ramp.target;
                        }
                    }
                });
            }
            EngineCommand::BankGain(bank, ramp) => self.mixer.bank_mut(bank).gain.ramp_to(ramp.target, ramp.frames),
            EngineCommand::BankPan(bank, ramp) => self.mixer.bank_mut(bank).pan.ramp_to(ramp.target, ramp.frames),
            EngineCommand::BankMute(bank, muted) => self.mixer.bank_mut(bank).muted = muted,
            EngineCommand::BankSolo(bank, soloed) => self.mixer.bank_mut(bank).soloed = soloed,
            EngineCommand::MasterGain(ramp) => self.mixer.master_gain_mut().ramp_to(ramp.target, ramp.frames),
            EngineCommand::Compressor(settings) => self.mixer.compressor_mut().configure(&settings),
            EngineCommand::Effects(chain) => {
                let old = self.mixer.replace_effects(chain);
                let _ = self.garbage.try_send(Garbage::Effects(old));
            }
            EngineCommand::Tap(tap) => {
                if let Some(old) = self.mixer.replace_tap(tap) {
                    let _ = self.garbage.try_send(Garbage::Tap(old));
                }
            }
            EngineCommand::CancelPending => {
                let garbage = &self.garbage;
                self.queue.remove_where(
                    |c| matches!(c, EngineCommand::StartVoice(plan) if plan.origin == TriggerOrigin::Sequencer),
                    |c| {
                        let _ = garbage.try_send(Garbage::Command(c));
                    },
                );
            }
        }
    }
}

fn discard_voice(garbage: &Sender<Garbage>, mut voice: Voice) {
    if let Some(buffer) = voice.take_buffer() {
        let _ = garbage.try_send(Garbage::Buffer(buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Ramp;
    use crate::envelope::EnvelopePlan;
    use crate::filter::FilterSpec;
    use crate::renderer::{RenderSettings, VoiceRenderer};
    use crate::voice::{VoicePlan, VoiceSource};
    use pl_ir::{BankId, ParamOverrides, SampleBuffer, SampleSlot, SlotId};

    const RATE: u32 = 48000;

    fn engine() -> (Engine, EngineHandle) {
        let (engine, handle) = Engine::new(EngineSettings::new(RATE));
        // Unity gains so output equals the raw sample.
        let tx = handle.commands.clone();
        for slot in SlotId::all() {
            tx.send(EngineCommand::SlotGain(slot, Ramp::new(1.0, 0, 0))).unwrap();
        }
        for bank in BankId::all() {
            tx.send(EngineCommand::BankGain(bank, Ramp::new(1.0, 0, 0))).unwrap();
        }
        tx.send(EngineCommand::MasterGain(Ramp::new(1.0, 0, 0))).unwrap();
        (engine, handle)
    }

    fn dc_plan(slot: usize, start: u64, stop: u64, origin: TriggerOrigin) -> VoicePlan {
        VoicePlan {
            slot: SlotId::new(slot),
            origin,
            source: VoiceSource::Sample {
                buffer: Arc::new(SampleBuffer::mono(vec![1.0; 48000], RATE)),
                offset: 0,
                direction: Default::default(),
                looping: false,
            },
            envelope: EnvelopePlan { start, peak: start, release: stop, stop },
            pitch_cents: 0.0,
            detune_cents: 0.0,
            pitch_locked: false,
            gain_lock: None,
            filter: FilterSpec::default(),
        }
    }

    /// A plan reading a buffer whose value is its own frame index / 4800.
    fn ramp_plan(start: u64, pitch_locked: bool) -> VoicePlan {
        let mut plan = dc_plan(0, start, 40_000, TriggerOrigin::Sequencer);
        plan.source = VoiceSource::Sample {
            buffer: Arc::new(SampleBuffer::mono((0..4800).map(|i| i as f32 / 4800.0).collect(), RATE)),
            offset: 0,
            direction: Default::default(),
            looping: false,
        };
        plan.pitch_locked = pitch_locked;
        plan
    }

    /// Render up to and including the block holding `frame`, returning the
    /// step between `frame` and `frame + 1` in the left output.
    fn slope_at(engine: &mut Engine, frame: u64) -> f32 {
        loop {
            let block_start = engine.clock().frames();
            let block = engine.render_block(256);
            if frame + 1 < block_start + 256 {
                let i = (frame - block_start) as usize;
                return block.channel(0)[i + 1] - block.channel(0)[i];
            }
        }
    }

    fn first_nonzero(buf: &AudioBuffer) -> Option<usize> {
        buf.channel(0).iter().position(|&s| s != 0.0)
    }

    #[test]
    fn voice_starts_at_exact_frame() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(dc_plan(0, 300, 10_000, TriggerOrigin::Pad))).unwrap();
        let first = engine.render_block(256);
        assert_eq!(first_nonzero(first), None);
        let second = engine.render_block(256);
        assert_eq!(first_nonzero(second), Some(300 - 256));
        assert_eq!(engine.pool().active_count(), 1);
    }

    #[test]
    fn future_commands_wait_in_queue() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(dc_plan(0, 5000, 10_000, TriggerOrigin::Pad))).unwrap();
        engine.render_block(256);
        assert_eq!(engine.pending_events(), 1);
        assert_eq!(engine.pool().active_count(), 0);
    }

    #[test]
    fn cancel_pending_keeps_pad_triggers_and_sounding_voices() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(dc_plan(0, 10, 20_000, TriggerOrigin::Sequencer))).unwrap();
        tx.send(EngineCommand::StartVoice(dc_plan(1, 9000, 20_000, TriggerOrigin::Sequencer))).unwrap();
        tx.send(EngineCommand::StartVoice(dc_plan(2, 9000, 20_000, TriggerOrigin::Pad))).unwrap();
        engine.render_block(256);
        assert_eq!(engine.pool().active_count(), 1);
        tx.send(EngineCommand::CancelPending).unwrap();
        engine.render_block(256);
        assert_eq!(engine.pending_events(), 1);
        assert_eq!(engine.pool().active_count(), 1);
        assert!(handle.collect_garbage() >= 1);
    }

    #[test]
    fn queued_voice_takes_later_slot_pitch() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(ramp_plan(1000, false))).unwrap();
        tx.send(EngineCommand::SlotPitch(SlotId::new(0), Ramp::new(1200.0, 0, 0))).unwrap();
        // An octave up reads two buffer frames per output frame.
        let slope = slope_at(&mut engine, 1001);
        assert!((slope - 2.0 / 4800.0).abs() < 1e-6, "slope {}", slope);
    }

    #[test]
    fn queued_locked_voice_keeps_its_pitch() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(ramp_plan(1000, true))).unwrap();
        tx.send(EngineCommand::SlotPitch(SlotId::new(0), Ramp::new(1200.0, 0, 0))).unwrap();
        let slope = slope_at(&mut engine, 1001);
        assert!((slope - 1.0 / 4800.0).abs() < 1e-6, "slope {}", slope);
    }

    #[test]
    fn repeated_triggers_overlap_and_survive_stop() {
        let (mut engine, handle) = engine();
        let mut tx = handle.commands.clone();
        let mut slot = SampleSlot::default();
        slot.buffer = Some(Arc::new(SampleBuffer::mono(vec![0.5; RATE as usize], RATE)));
        let renderer = VoiceRenderer::new(RATE, RenderSettings::default());
        let none = ParamOverrides::default();
        let first = renderer.trigger(SlotId::new(0), &slot, 0.0, &none, TriggerOrigin::Sequencer, &mut tx).unwrap();
        let second = renderer.trigger(SlotId::new(0), &slot, 0.1, &none, TriggerOrigin::Sequencer, &mut tx).unwrap();
        assert_ne!(first.stop_frame, second.stop_frame);

        for _ in 0..20 {
            engine.render_block(256);
        }
        let stops = |engine: &Engine| {
            let mut stops: Vec<u64> = engine.pool().voices().map(|v| v.stop_frame()).collect();
            stops.sort_unstable();
            stops
        };
        assert_eq!(engine.pool().slot_count(SlotId::new(0)), 2);
        assert_eq!(stops(&engine), vec![first.stop_frame, second.stop_frame]);

        tx.send(EngineCommand::CancelPending).unwrap();
        engine.render_block(256);
        assert_eq!(stops(&engine), vec![first.stop_frame, second.stop_frame]);
    }

    #[test]
    fn finished_voices_return_buffers() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(dc_plan(0, 0, 100, TriggerOrigin::Pad))).unwrap();
        engine.render_block(256);
        assert_eq!(engine.pool().active_count(), 0);
        assert_eq!(handle.collect_garbage(), 1);
        assert_eq!(handle.stats.voice_count(), 0);
    }

    #[test]
    fn clock_advances_by_rendered_frames() {
        let (mut engine, handle) = engine();
        let mut out = vec![0.0f32; 600 * 2];
        engine.render_interleaved(&mut out, 2);
        assert_eq!(handle.clock.frames(), 600);
    }

    #[test]
    fn mute_applies_immediately() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(dc_plan(0, 0, 10_000, TriggerOrigin::Pad))).unwrap();
        assert!(engine.render_block(64).peak() > 0.5);
        tx.send(EngineCommand::BankMute(BankId::new(0), true)).unwrap();
        assert_eq!(engine.render_block(64).peak(), 0.0);
        assert_eq!(engine.pool().active_count(), 1);
    }

    #[test]
    fn interleaved_output_duplicates_mono_voice() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::StartVoice(dc_plan(0, 0, 10_000, TriggerOrigin::Pad))).unwrap();
        let mut out = vec![0.0f32; 8];
        engine.render_interleaved(&mut out, 2);
        assert!(out.iter().all(|&s| (s - 1.0).abs() < 1e-6));
    }

    #[test]
    fn effects_swap_returns_old_chain() {
        let (mut engine, handle) = engine();
        let tx = handle.commands.clone();
        tx.send(EngineCommand::Effects(Vec::new())).unwrap();
        engine.render_block(16);
        assert_eq!(handle.collect_garbage(), 1);
    }
}
