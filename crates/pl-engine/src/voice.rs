//! Voice: a single playing instance of a slot.
//!
//! A voice is fully described by a [`VoicePlan`] built on the control path.
//! Once started on the render path it reads its own buffer reference, so
//! replacing the slot's sample never disturbs it.

use std::sync::Arc;

use pl_ir::{PlaybackDirection, SampleBuffer, SlotId, ROOT_NOTE};

use crate::envelope::EnvelopePlan;
use crate::filter::{FilterSpec, StereoFilter};
use crate::frequency::{cents_to_ratio, note_to_hz};
use crate::smoothing::SmoothedParam;

/// Output level of the synth oscillator relative to full scale.
const SYNTH_LEVEL: f32 = 0.5;

/// Who asked for the voice. Only sequencer triggers are cancelled by a
/// transport stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerOrigin {
    Sequencer,
    Pad,
}

/// Oscillator shape of the synth bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Saw,
    Square,
    Triangle,
    Sine,
}

impl Waveform {
    /// One sample at `phase` in 0..1.
    #[inline]
    pub fn sample(self, phase: f64) -> f32 {
        let p = phase as f32;
        match self {
            Waveform::Saw => 2.0 * p - 1.0,
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
            Waveform::Sine => (p * core::f32::consts::TAU).sin(),
        }
    }
}

/// What a voice reads.
#[derive(Clone, Debug)]
pub enum VoiceSource {
    Sample {
        buffer: Arc<SampleBuffer>,
        /// First buffer frame of the playable window.
        offset: usize,
        direction: PlaybackDirection,
        looping: bool,
    },
    Synth { waveform: Waveform },
}

/// Everything needed to start a voice at an exact frame.
#[derive(Clone, Debug)]
pub struct VoicePlan {
    pub slot: SlotId,
    pub origin: TriggerOrigin,
    pub source: VoiceSource,
    pub envelope: EnvelopePlan,
    /// Slot pitch in cents at trigger time.
    pub pitch_cents: f32,
    /// Locked detune in cents, added on top of the pitch.
    pub detune_cents: f32,
    /// Locked pitch; the voice ignores later slot pitch ramps.
    pub pitch_locked: bool,
    /// Locked volume; the voice bypasses the slot's live gain.
    pub gain_lock: Option<f32>,
    pub filter: FilterSpec,
}

/// Identifies a scheduled voice to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceHandle {
    pub slot: SlotId,
    pub start_frame: u64,
    pub stop_frame: u64,
}

impl VoicePlan {
    pub fn handle(&self) -> VoiceHandle {
        VoiceHandle {
            slot: self.slot,
            start_frame: self.envelope.start,
            stop_frame: self.envelope.stop,
        }
    }
}

/// Render-side state of one voice.
#[derive(Debug)]
pub struct Voice {
    slot: SlotId,
    origin: TriggerOrigin,
    source: VoiceSource,
    envelope: EnvelopePlan,
    /// Position within the playable window, in buffer frames (or cycles
    /// for the synth).
    position: f64,
    /// Ping-pong travel direction.
    forward: bool,
    /// Increment at zero cents.
    base_increment: f64,
    cents: SmoothedParam,
    detune_offset: f32,
    ratio: f64,
    ratio_cents: f32,
    pitch_locked: bool,
    gain_lock: Option<f32>,
    filter: StereoFilter,
    /// Steal fade: gain falls linearly to zero from the first frame to the
    /// second.
    fade: Option<(u64, u64)>,
    finished: bool,
}

impl Voice {
    pub fn new(plan: VoicePlan, output_rate: u32) -> Self {
        let output_rate = output_rate.max(1) as f64;
        let base_increment = match &plan.source {
            VoiceSource::Sample { buffer, .. } => buffer.sample_rate() as f64 / output_rate,
            VoiceSource::Synth { .. } => note_to_hz(ROOT_NOTE as f64) / output_rate,
        };
        let cents = plan.pitch_cents + plan.detune_cents;
        Self {
            slot: plan.slot,
            origin: plan.origin,
            source: plan.source,
            envelope: plan.envelope,
            position: 0.0,
            forward: true,
            base_increment,
            cents: SmoothedParam::new(cents),
            detune_offset: plan.detune_cents,
            ratio: cents_to_ratio(cents),
            ratio_cents: cents,
            pitch_locked: plan.pitch_locked,
            gain_lock: plan.gain_lock,
            filter: StereoFilter::new(&plan.filter),
            fade: None,
            finished: plan.envelope.stop <= plan.envelope.start,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn origin(&self) -> TriggerOrigin {
        self.origin
    }

    pub fn envelope(&self) -> &EnvelopePlan {
        &self.envelope
    }

    /// Last frame (exclusive) the voice can sound, including a steal fade.
    pub fn stop_frame(&self) -> u64 {
        match self.fade {
            Some((_, until)) => until.min(self.envelope.stop),
            None => self.envelope.stop,
        }
    }

    /// True once the voice has been cut short by [`fade_out`](Self::fade_out).
    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Cut the voice short: from frame `at` its gain falls linearly to zero
    /// over `frames` frames, scaling whatever the envelope is doing then.
    pub fn fade_out(&mut self, at: u64, frames: u64) {
        if self.fade.is_none() {
            self.fade = Some((at, at + frames.max(1)));
        }
    }

    pub fn gain_lock(&self) -> Option<f32> {
        self.gain_lock
    }

    pub fn is_pitch_locked(&self) -> bool {
        self.pitch_locked
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current detune in cents, including any lock offset.
    pub fn cents(&self) -> f32 {
        self.cents.value()
    }

    /// Follow a live pitch change of the slot. Locked voices keep their pitch.
    pub fn ramp_pitch(&mut self, slot_cents: f32, frames: u32) {
        if !self.pitch_locked {
            self.cents.ramp_to(slot_cents + self.detune_offset, frames);
        }
    }

    /// Release the buffer reference so it can be dropped off the render path.
    pub fn take_buffer(&mut self) -> Option<Arc<SampleBuffer>> {
        match core::mem::replace(&mut self.source, VoiceSource::Synth { waveform: Waveform::Saw }) {
            VoiceSource::Sample { buffer, .. } => Some(buffer),
            VoiceSource::Synth { .. } => None,
        }
    }

    /// Add this voice into `left`/`right`, which hold the frames starting at
    /// `block_start` on the engine timeline.
    pub fn render(&mut self, block_start: u64, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let gain_scale = self.gain_lock.unwrap_or(1.0);
        for i in 0..frames {
            if self.finished {
                return;
            }
            let frame = block_start + i as u64;
            if frame < self.envelope.start {
                continue;
            }
            if frame >= self.stop_frame() {
                self.finished = true;
                return;
            }
            let cents = self.cents.next();
            if cents != self.ratio_cents {
                self.ratio = cents_to_ratio(cents);
                self.ratio_cents = cents;
            }
            let Some((l, r)) = self.read() else {
                self.finished = true;
                return;
            };
            self.advance(self.base_increment * self.ratio);
            let (l, r) = self.filter.process(l, r);
            let mut gain = self.envelope.gain_at(frame) * gain_scale;
            if let Some((from, until)) = self.fade {
                if frame >= from {
                    gain *= (until - frame) as f32 / (until - from) as f32;
                }
            }
            left[i] += l * gain;
            right[i] += r * gain;
        }
    }

    fn read(&self) -> Option<(f32, f32)> {
        match &self.source {
            VoiceSource::Sample { buffer, offset, direction, .. } => {
                let frames = buffer.frames();
                if *offset >= frames {
                    return None;
                }
                let index = match direction {
                    PlaybackDirection::Reverse => (frames - 1 - offset) as f64 - self.position,
                    _ => *offset as f64 + self.position,
                };
                Some(buffer.frame_interpolated(index))
            }
            VoiceSource::Synth { waveform } => {
                let s = waveform.sample(self.position) * SYNTH_LEVEL;
                Some((s, s))
            }
        }
    }

    fn advance(&mut self, increment: f64) {
        match &self.source {
            VoiceSource::Sample { buffer, offset, direction, looping } => {
                let len = buffer.frames().saturating_sub(*offset) as f64;
                match direction {
                    PlaybackDirection::Forward | PlaybackDirection::Reverse => {
                        self.position += increment;
                        if self.position >= len {
                            if *looping && len > 0.0 {
                                self.position %= len;
                            } else {
                                self.finished = true;
                            }
                        }
                    }
                    PlaybackDirection::PingPong => {
                        let last = (len - 1.0).max(0.0);
                        if self.forward {
                            self.position += increment;
                            if self.position > last {
                                self.position = (2.0 * last - self.position).max(0.0);
                                self.forward = false;
                            }
                        } else {
                            self.position -= increment;
                            if self.position < 0.0 {
                                if *looping {
                                    self.position = (-self.position).min(last);
                                    self.forward = true;
                                } else {
                                    self.finished = true;
                                }
                            }
                        }
                    }
                }
            }
            VoiceSource::Synth { .. } => {
                self.position += increment;
                if self.position >= 1.0 {
                    self.position -= self.position.floor();
                }
            }
        }
    }
}
