//! Turns a trigger request into a fully planned voice.
//!
//! Everything that needs allocation or transcendental math (buffer
//! references, filter coefficients, envelope frames) is resolved here, on
//! the control path, so the render path only copies the plan into the pool.

use std::sync::Arc;

use pl_ir::{ParamOverrides, SampleSlot, SlotId};
use tracing::trace;

use crate::clock::seconds_to_frames;
use crate::commands::{CommandSink, EngineCommand};
use crate::envelope::EnvelopePlan;
use crate::filter::FilterSpec;
use crate::frequency::semitones_to_cents;
use crate::voice::{TriggerOrigin, VoiceHandle, VoicePlan, VoiceSource, Waveform};

/// Envelope and synth settings shared by every voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    /// Attack ramp in seconds.
    pub ramp_seconds: f64,
    /// Release ramp in seconds.
    pub release_seconds: f64,
    /// Synth note length at full decay.
    pub synth_seconds: f64,
    pub synth_waveform: Waveform,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ramp_seconds: 0.005,
            release_seconds: 0.020,
            synth_seconds: 2.0,
            synth_waveform: Waveform::Saw,
        }
    }
}

/// Prepares voices for one output sample rate.
#[derive(Clone, Debug)]
pub struct VoiceRenderer {
    sample_rate: u32,
    settings: RenderSettings,
}

impl VoiceRenderer {
    pub fn new(sample_rate: u32, settings: RenderSettings) -> Self {
        Self { sample_rate: sample_rate.max(1), settings }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn set_synth_waveform(&mut self, waveform: Waveform) {
        self.settings.synth_waveform = waveform;
    }

    /// Plan a voice for `slot` starting at `time` seconds on the audio
    /// timeline. Returns `None` when the slot has nothing audible: no
    /// buffer, or a zero-length window after start and decay.
    pub fn prepare(
        &self,
        slot_id: SlotId,
        slot: &SampleSlot,
        time: f64,
        overrides: &ParamOverrides,
        origin: TriggerOrigin,
    ) -> Option<VoicePlan> {
        let params = slot.params.resolve(overrides);
        let (source, window) = if slot_id.is_synth() {
            let source = VoiceSource::Synth { waveform: self.settings.synth_waveform };
            (source, params.decay as f64 * self.settings.synth_seconds)
        } else {
            let buffer = slot.buffer.as_ref().filter(|b| !b.is_empty())?;
            let frames = buffer.frames();
            let offset = ((params.start as f64 * frames as f64) as usize).min(frames);
            let remaining = (frames - offset) as f64 / buffer.sample_rate().max(1) as f64;
            let source = VoiceSource::Sample {
                buffer: Arc::clone(buffer),
                offset,
                direction: params.direction,
                looping: params.looping,
            };
            (source, remaining * params.decay as f64)
        };

        let start = seconds_to_frames(time, self.sample_rate);
        let stop = seconds_to_frames(time + window, self.sample_rate);
        if stop <= start {
            trace!(slot = slot_id.index(), "trigger has an empty window");
            return None;
        }

        let envelope = EnvelopePlan::new(
            start,
            stop,
            seconds_to_frames(self.settings.ramp_seconds, self.sample_rate),
            seconds_to_frames(self.settings.release_seconds, self.sample_rate),
        );
        Some(VoicePlan {
            slot: slot_id,
            origin,
            source,
            envelope,
            pitch_cents: semitones_to_cents(params.pitch),
            detune_cents: params.detune,
            pitch_locked: params.pitch_locked,
            gain_lock: params.gain_lock,
            filter: FilterSpec::new(params.lowpass, params.highpass, self.sample_rate),
        })
    }

    /// Plan a voice and hand it to the engine.
    pub fn trigger<S: CommandSink + ?Sized>(
        &self,
        slot_id: SlotId,
        slot: &SampleSlot,
        time: f64,
        overrides: &ParamOverrides,
        origin: TriggerOrigin,
        sink: &mut S,
    ) -> Option<VoiceHandle> {
        let plan = self.prepare(slot_id, slot, time, overrides, origin)?;
        let handle = plan.handle();
        sink.send(EngineCommand::StartVoice(plan));
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_ir::SampleBuffer;

    const RATE: u32 = 48000;

    fn slot_with_seconds(seconds: f64) -> SampleSlot {
        let frames = (seconds * RATE as f64) as usize;
        let mut slot = SampleSlot::default();
        slot.buffer = Some(Arc::new(SampleBuffer::mono(vec![0.5; frames], RATE)));
        slot
    }

    fn renderer() -> VoiceRenderer {
        VoiceRenderer::new(RATE, RenderSettings::default())
    }

    #[test]
    fn full_decay_plays_remaining_buffer() {
        let slot = slot_with_seconds(1.0);
        let plan = renderer()
            .prepare(SlotId::new(0), &slot, 2.0, &ParamOverrides::default(), TriggerOrigin::Pad)
            .unwrap();
        assert_eq!(plan.envelope.start, 96000);
        assert_eq!(plan.envelope.stop, 144000);
        assert_eq!(plan.envelope.peak, 96000 + 240);
        assert_eq!(plan.envelope.release, 144000 - 960);
    }

    #[test]
    fn start_and_decay_shorten_window() {
        let mut slot = slot_with_seconds(2.0);
        slot.params.start = 0.5;
        slot.params.decay = 0.5;
        let plan = renderer()
            .prepare(SlotId::new(1), &slot, 0.0, &ParamOverrides::default(), TriggerOrigin::Pad)
            .unwrap();
        // (2.0 - 1.0) * 0.5 seconds.
        assert_eq!(plan.envelope.stop, 24000);
        match plan.source {
            VoiceSource::Sample { offset, .. } => assert_eq!(offset, 48000),
            VoiceSource::Synth { .. } => panic!("expected sample source"),
        }
    }

    #[test]
    fn empty_slot_is_skipped() {
        let slot = SampleSlot::default();
        assert!(renderer()
            .prepare(SlotId::new(2), &slot, 0.0, &ParamOverrides::default(), TriggerOrigin::Pad)
            .is_none());
    }

    #[test]
    fn zero_decay_is_skipped() {
        let mut slot = slot_with_seconds(1.0);
        slot.params.decay = 0.0;
        assert!(renderer()
            .prepare(SlotId::new(0), &slot, 0.0, &ParamOverrides::default(), TriggerOrigin::Pad)
            .is_none());
    }

    #[test]
    fn short_window_collapses_envelope() {
        let slot = slot_with_seconds(0.01);
        let plan = renderer()
            .prepare(SlotId::new(0), &slot, 0.0, &ParamOverrides::default(), TriggerOrigin::Pad)
            .unwrap();
        assert!(!plan.envelope.has_plateau());
        assert_eq!(plan.envelope.stop, 480);
    }

    #[test]
    fn locks_override_live_values() {
        let mut slot = slot_with_seconds(1.0);
        slot.params.pitch = 3.0;
        let overrides = ParamOverrides { pitch: Some(-5.0), volume: Some(0.4), detune: Some(10.0), ..Default::default() };
        let plan = renderer()
            .prepare(SlotId::new(0), &slot, 0.0, &overrides, TriggerOrigin::Sequencer)
            .unwrap();
        assert_eq!(plan.pitch_cents, -500.0);
        assert_eq!(plan.detune_cents, 10.0);
        assert!(plan.pitch_locked);
        assert_eq!(plan.gain_lock, Some(0.4));
        assert_eq!(plan.origin, TriggerOrigin::Sequencer);
    }

    #[test]
    fn synth_bank_needs_no_buffer() {
        let slot = SampleSlot::default();
        let plan = renderer()
            .prepare(SlotId::new(24), &slot, 1.0, &ParamOverrides::default(), TriggerOrigin::Pad)
            .unwrap();
        assert!(matches!(plan.source, VoiceSource::Synth { waveform: Waveform::Saw }));
        assert_eq!(plan.envelope.stop - plan.envelope.start, 96000);
    }

    #[test]
    fn trigger_sends_start_command() {
        let slot = slot_with_seconds(0.5);
        let mut sink: Vec<EngineCommand> = Vec::new();
        let handle = renderer()
            .trigger(SlotId::new(3), &slot, 0.25, &ParamOverrides::default(), TriggerOrigin::Pad, &mut sink)
            .unwrap();
        assert_eq!(handle.start_frame, 12000);
        assert_eq!(sink.len(), 1);
        assert!(matches!(&sink[0], EngineCommand::StartVoice(p) if p.slot == SlotId::new(3)));
    }
}
