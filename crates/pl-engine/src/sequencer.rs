//! Transport and lookahead scheduling across all banks.
//!
//! [`Sequencer::tick`] is called by a timer, typically every 25 ms. Each
//! call schedules every step due before `now + lookahead` as exact-frame
//! voice starts, so timer jitter never reaches the audio.

use std::sync::Arc;

use pl_ir::{BankId, ParamOverrides, Project, SlotId, NUM_BANKS};
use tracing::info;

use crate::clock::AudioClock;
use crate::commands::{CommandSink, EngineCommand};
use crate::renderer::VoiceRenderer;
use crate::scheduler::{ScheduleContext, TrackScheduler, TrackStatus};
use crate::tempo::TempoClock;
use crate::voice::{TriggerOrigin, VoiceHandle};

/// Timing of the lookahead loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerSettings {
    /// How far ahead of now steps are scheduled, in seconds.
    pub lookahead: f64,
    /// Gap between pressing play and the first step, in seconds.
    pub start_delay: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { lookahead: 0.1, start_delay: 0.05 }
    }
}

pub struct Sequencer<C: AudioClock> {
    clock: C,
    tempo: TempoClock,
    tracks: [TrackScheduler; NUM_BANKS],
    renderer: VoiceRenderer,
    settings: SchedulerSettings,
    playing: bool,
}

impl<C: AudioClock> Sequencer<C> {
    pub fn new(clock: C, renderer: VoiceRenderer, settings: SchedulerSettings) -> Self {
        Self {
            clock,
            tempo: TempoClock::new(120.0),
            tracks: core::array::from_fn(|i| TrackScheduler::new(BankId::new(i))),
            renderer,
            settings,
            playing: false,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn tempo(&self) -> &TempoClock {
        &self.tempo
    }

    pub fn renderer(&self) -> &VoiceRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut VoiceRenderer {
        &mut self.renderer
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn track(&self, bank: BankId) -> &TrackScheduler {
        &self.tracks[bank.index()]
    }

    pub fn track_status(&self, bank: BankId) -> Arc<TrackStatus> {
        self.tracks[bank.index()].status()
    }

    /// Start or stop the transport. Repeating the current state does nothing.
    pub fn set_playing<S: CommandSink + ?Sized>(&mut self, playing: bool, project: &Project, sink: &mut S) {
        match (self.playing, playing) {
            (false, true) => self.start(project),
            (true, false) => self.stop(sink),
            _ => {}
        }
    }

    fn start(&mut self, project: &Project) {
        let at = self.clock.now() + self.settings.start_delay;
        self.tempo = TempoClock::new(project.clamped_tempo());
        self.tempo.start(at);
        for track in self.tracks.iter_mut() {
            track.start(project);
        }
        self.playing = true;
        info!(bpm = self.tempo.bpm(), at, "transport started");
    }

    /// Every track returns to step 0 of Part A. Steps already handed to the
    /// engine but not yet started are cancelled; sounding voices finish.
    fn stop<S: CommandSink + ?Sized>(&mut self, sink: &mut S) {
        for track in self.tracks.iter_mut() {
            track.stop();
        }
        sink.send(EngineCommand::CancelPending);
        self.playing = false;
        info!("transport stopped");
    }

    /// Run one lookahead pass. Picks up tempo changes from the project.
    pub fn tick<S: CommandSink + ?Sized>(&mut self, project: &Project, sink: &mut S) {
        let now = self.clock.now();
        let bpm = project.clamped_tempo();
        if (bpm as f64 - self.tempo.bpm()).abs() > 1e-6 {
            self.tempo.set_bpm(bpm, now);
            info!(bpm, "tempo changed");
        }
        if !self.playing {
            return;
        }
        let mut ctx = ScheduleContext {
            tempo: &self.tempo,
            project,
            renderer: &self.renderer,
            sink,
            now,
            window_end: now + self.settings.lookahead,
        };
        for track in self.tracks.iter_mut() {
            track.publish_due(now);
            track.schedule(&mut ctx);
        }
    }

    /// Trigger a pad now, or at `time` if it is still in the future.
    pub fn trigger_pad<S: CommandSink + ?Sized>(
        &self,
        slot: SlotId,
        time: Option<f64>,
        overrides: &ParamOverrides,
        project: &Project,
        sink: &mut S,
    ) -> Option<VoiceHandle> {
        let now = self.clock.now();
        let time = time.map_or(now, |t| t.max(now));
        self.renderer.trigger(slot, project.slots.get(slot), time, overrides, TriggerOrigin::Pad, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::renderer::RenderSettings;
    use pl_ir::{PatternId, SampleBuffer};

    const RATE: u32 = 48000;

    fn sequencer() -> Sequencer<Arc<ManualClock>> {
        Sequencer::new(
            Arc::new(ManualClock::new(0.0)),
            VoiceRenderer::new(RATE, RenderSettings::default()),
            SchedulerSettings { lookahead: 0.1, start_delay: 0.0 },
        )
    }

    fn project_with_hits() -> Project {
        let mut project = Project::new();
        project.slots.get_mut(SlotId::new(0)).buffer = Some(Arc::new(SampleBuffer::mono(vec![0.5; 480], RATE)));
        project.patterns_mut().get_mut(PatternId::new(0)).fill_part(0, pl_ir::Part::A);
        project
    }

    fn starts(commands: &[EngineCommand]) -> usize {
        commands.iter().filter(|c| matches!(c, EngineCommand::StartVoice(_))).count()
    }

    #[test]
    fn ticks_cover_each_step_once() {
        let mut seq = sequencer();
        let project = project_with_hits();
        let mut sink = Vec::new();
        seq.set_playing(true, &project, &mut sink);
        // Tick every 25 ms for one second.
        for i in 0..40 {
            seq.clock().set(i as f64 * 0.025);
            seq.tick(&project, &mut sink);
        }
        // Steps at 0..=1.0 s inside the final window (now 0.975 + 0.1).
        assert_eq!(starts(&sink), 9);
    }

    #[test]
    fn stop_sends_cancel_and_is_idempotent() {
        let mut seq = sequencer();
        let project = project_with_hits();
        let mut sink = Vec::new();
        seq.set_playing(true, &project, &mut sink);
        seq.set_playing(false, &project, &mut sink);
        seq.set_playing(false, &project, &mut sink);
        let cancels = sink.iter().filter(|c| matches!(c, EngineCommand::CancelPending)).count();
        assert_eq!(cancels, 1);
        assert!(!seq.is_playing());
    }

    #[test]
    fn stopped_transport_schedules_nothing() {
        let mut seq = sequencer();
        let project = project_with_hits();
        let mut sink = Vec::new();
        seq.tick(&project, &mut sink);
        assert!(sink.is_empty());
    }

    #[test]
    fn restart_begins_at_part_a() {
        let mut seq = sequencer();
        let project = project_with_hits();
        let mut sink = Vec::new();
        seq.set_playing(true, &project, &mut sink);
        seq.clock().set(0.5);
        seq.tick(&project, &mut sink);
        seq.set_playing(false, &project, &mut sink);
        sink.clear();
        seq.set_playing(true, &project, &mut sink);
        seq.tick(&project, &mut sink);
        let first = sink.iter().find_map(|c| match c {
            EngineCommand::StartVoice(plan) => Some(plan.envelope.start),
            _ => None,
        });
        assert_eq!(first, Some(24000));
        assert_eq!(seq.track(BankId::new(0)).position().part, pl_ir::Part::A);
    }

    #[test]
    fn tempo_follows_project() {
        let mut seq = sequencer();
        let mut project = project_with_hits();
        let mut sink = Vec::new();
        seq.set_playing(true, &project, &mut sink);
        project.tempo = 60.0;
        seq.tick(&project, &mut sink);
        assert_eq!(seq.tempo().bpm(), 60.0);
    }

    #[test]
    fn pad_trigger_never_in_past() {
        let seq = sequencer();
        let project = project_with_hits();
        seq.clock().set(1.0);
        let mut sink = Vec::new();
        let handle = seq
            .trigger_pad(SlotId::new(0), Some(0.5), &ParamOverrides::default(), &project, &mut sink)
            .unwrap();
        assert_eq!(handle.start_frame, 48000);
        let later = seq
            .trigger_pad(SlotId::new(0), Some(2.0), &ParamOverrides::default(), &project, &mut sink)
            .unwrap();
        assert_eq!(later.start_frame, 96000);
    }
}
