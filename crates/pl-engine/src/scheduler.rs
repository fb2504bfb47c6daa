//! Per-bank pattern tracks for the lookahead scheduler.
//!
//! A track walks its pattern one step at a time, on the part's own grid,
//! and schedules every step whose (groove-adjusted) time falls inside the
//! lookahead window. Step positions are published to the control side only
//! once their trigger time has been reached.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};
use std::sync::Arc;

use heapless::Deque;
use pl_ir::{trigger_offset, BankId, MusicalTime, Part, Pattern, PatternId, Project};
use tracing::{debug, trace};

use crate::commands::CommandSink;
use crate::renderer::VoiceRenderer;
use crate::tempo::TempoClock;
use crate::voice::TriggerOrigin;

/// Scheduled-but-unpublished positions a track remembers.
const PENDING_POSITIONS: usize = 64;

/// Where a track is within its pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackPosition {
    /// Step within the current part.
    pub step: u8,
    pub part: Part,
    /// Completed plays of the current part.
    pub repetition: u16,
}

impl TrackPosition {
    /// Index into the pattern's 32 steps.
    pub fn pattern_step(&self) -> usize {
        self.part.step_offset() + self.step as usize
    }

    /// Move to the next step. At the end of a part the repetition counter
    /// increments; once it reaches the part's repeat count, playback hands
    /// over to the other part. Returns true on a part change.
    pub fn advance(&mut self, pattern: &Pattern) -> bool {
        let config = pattern.part(self.part);
        self.step += 1;
        if (self.step as usize) < config.steps() {
            return false;
        }
        self.step = 0;
        self.repetition += 1;
        if self.repetition < config.repeat_count() {
            return false;
        }
        self.repetition = 0;
        self.part = self.part.other();
        true
    }
}

/// Running state of a track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TrackState {
    #[default]
    Stopped,
    Running,
}

/// A copy of a track's published position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub position: TrackPosition,
    pub pattern: PatternId,
    pub running: bool,
}

/// Lock-free view of a track, safe to read from any thread.
#[derive(Debug)]
pub struct TrackStatus {
    step: AtomicU8,
    part: AtomicU8,
    repetition: AtomicU16,
    pattern: AtomicU8,
    running: AtomicBool,
}

impl TrackStatus {
    fn new(pattern: PatternId) -> Self {
        Self {
            step: AtomicU8::new(0),
            part: AtomicU8::new(0),
            repetition: AtomicU16::new(0),
            pattern: AtomicU8::new(pattern.index() as u8),
            running: AtomicBool::new(false),
        }
    }

    fn publish(&self, position: TrackPosition, pattern: PatternId, running: bool) {
        self.step.store(position.step, Ordering::Relaxed);
        self.part.store(position.part.index() as u8, Ordering::Relaxed);
        self.repetition.store(position.repetition, Ordering::Relaxed);
        self.pattern.store(pattern.index() as u8, Ordering::Relaxed);
        self.running.store(running, Ordering::Release);
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        let running = self.running.load(Ordering::Acquire);
        TrackSnapshot {
            position: TrackPosition {
                step: self.step.load(Ordering::Relaxed),
                part: Part::from_index(self.part.load(Ordering::Relaxed) as usize),
                repetition: self.repetition.load(Ordering::Relaxed),
            },
            pattern: PatternId::new(self.pattern.load(Ordering::Relaxed) as usize),
            running,
        }
    }
}

/// Shared inputs of one scheduling pass.
pub struct ScheduleContext<'a, S: CommandSink + ?Sized> {
    pub tempo: &'a TempoClock,
    pub project: &'a Project,
    pub renderer: &'a VoiceRenderer,
    pub sink: &'a mut S,
    /// Current audio time in seconds.
    pub now: f64,
    /// Exclusive end of the lookahead window.
    pub window_end: f64,
}

/// One bank's pattern playback.
pub struct TrackScheduler {
    bank: BankId,
    state: TrackState,
    pattern: PatternId,
    position: TrackPosition,
    next_step: MusicalTime,
    steps_scheduled: u64,
    pending: Deque<(f64, TrackPosition, PatternId), PENDING_POSITIONS>,
    status: Arc<TrackStatus>,
}

impl TrackScheduler {
    pub fn new(bank: BankId) -> Self {
        let pattern = bank.first_pattern();
        Self {
            bank,
            state: TrackState::Stopped,
            pattern,
            position: TrackPosition::default(),
            next_step: MusicalTime::zero(),
            steps_scheduled: 0,
            pending: Deque::new(),
            status: Arc::new(TrackStatus::new(pattern)),
        }
    }

    pub fn bank(&self) -> BankId {
        self.bank
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn pattern(&self) -> PatternId {
        self.pattern
    }

    /// Position of the next step to be scheduled.
    pub fn position(&self) -> TrackPosition {
        self.position
    }

    /// Musical time of the next step to be scheduled.
    pub fn next_step_time(&self) -> MusicalTime {
        self.next_step
    }

    pub fn steps_scheduled(&self) -> u64 {
        self.steps_scheduled
    }

    pub fn status(&self) -> Arc<TrackStatus> {
        Arc::clone(&self.status)
    }

    /// Begin at step 0 of Part A on the bank's selected pattern.
    pub fn start(&mut self, project: &Project) {
        self.state = TrackState::Running;
        self.reset_position();
        self.adopt_selected_pattern(project);
        self.status.publish(self.position, self.pattern, true);
    }

    /// Stop and rewind to step 0 of Part A.
    pub fn stop(&mut self) {
        self.state = TrackState::Stopped;
        self.reset_position();
        self.status.publish(self.position, self.pattern, false);
    }

    fn reset_position(&mut self) {
        self.position = TrackPosition::default();
        self.next_step = MusicalTime::zero();
        self.steps_scheduled = 0;
        self.pending.clear();
    }

    fn adopt_selected_pattern(&mut self, project: &Project) {
        let selected = project.bank(self.bank).pattern;
        if selected == self.pattern {
            return;
        }
        if selected.bank() != self.bank {
            debug!(bank = self.bank.index(), pattern = selected.index(), "ignoring pattern from another bank");
            return;
        }
        debug!(bank = self.bank.index(), from = self.pattern.index(), to = selected.index(), "pattern switch");
        self.pattern = selected;
    }

    /// Schedule every step whose nominal time is before the window end.
    pub fn schedule<S: CommandSink + ?Sized>(&mut self, ctx: &mut ScheduleContext<'_, S>) {
        if self.state != TrackState::Running {
            return;
        }
        loop {
            let nominal = ctx.tempo.seconds_at(self.next_step);
            if nominal >= ctx.window_end {
                break;
            }
            if self.position.step == 0 {
                self.adopt_selected_pattern(ctx.project);
            }
            let pattern = ctx.project.patterns.get(self.pattern);
            let config = *pattern.part(self.position.part);
            let settings = ctx.project.bank(self.bank);
            let offset = trigger_offset(
                settings.groove,
                self.position.step as usize,
                ctx.tempo.step_duration(config.resolution),
                settings.groove_depth,
            );
            let time = (nominal + offset).max(ctx.now);
            let step = self.position.pattern_step();

            for slot in self.bank.slots() {
                let lane = pattern.lane(slot.lane());
                if !lane.step(step).active {
                    continue;
                }
                let overrides = lane.overrides_at(step);
                ctx.renderer.trigger(
                    slot,
                    ctx.project.slots.get(slot),
                    time,
                    &overrides,
                    TriggerOrigin::Sequencer,
                    &mut *ctx.sink,
                );
            }

            if self.pending.is_full() {
                self.pending.pop_front();
            }
            let _ = self.pending.push_back((time, self.position, self.pattern));
            trace!(bank = self.bank.index(), step, time, "step scheduled");

            if self.position.advance(pattern) {
                trace!(bank = self.bank.index(), part = ?self.position.part, "part change");
            }
            self.next_step = self.next_step.add_steps(1, config.resolution);
            self.steps_scheduled += 1;
        }
    }

    /// Publish the latest scheduled position whose time has arrived.
    pub fn publish_due(&mut self, now: f64) {
        let mut latest = None;
        while let Some(&(time, position, pattern)) = self.pending.front() {
            if time > now {
                break;
            }
            latest = Some((position, pattern));
            self.pending.pop_front();
        }
        if let Some((position, pattern)) = latest {
            self.status.publish(position, pattern, self.state == TrackState::Running);
        }
    }
}
