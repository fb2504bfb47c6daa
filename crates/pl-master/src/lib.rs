//! Headless controller for padloop.
//!
//! Provides one API for pads, transport, recording and rendering that the
//! CLI (or any front end) drives. The controller owns the authoritative
//! [`Project`] and publishes it to the lookahead timer through an
//! [`ArcSwap`]; the [`Engine`] itself lives wherever audio is rendered,
//! either a device callback or an offline loop.

mod config;
mod error;
mod offline;
mod playback;
mod recording;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::Sender;
use pl_audio::{AudioOutput, CpalInput, CpalOutput};
use pl_engine::{
    EngineCommand, EngineHandle, ParamSync, RecorderState, Sequencer, TrackSnapshot, TrackStatus, VoiceHandle,
    VoiceRenderer,
};
use ringbuf::traits::{Consumer, Observer, Split};
use ringbuf::{HeapCons, HeapRb};
use tracing::{info, warn};

use crate::playback::{TimerHandle, Transport};
use crate::recording::InputHandle;

// Re-export common types so callers don't need pl-ir/pl-engine directly.
pub use config::{Config, RecorderConfig};
pub use error::ControllerError;
pub use offline::render_offline;
pub use pl_engine::Engine;
pub use pl_ir::{BankId, ParamOverrides, Project, SampleBuffer, SlotId, NUM_BANKS};

/// Called with the target slot and the new buffer whenever a recording or
/// a resampling take is loaded.
pub type CaptureCallback = Box<dyn FnMut(SlotId, &SampleBuffer) + Send>;

pub struct Controller {
    config: Config,
    sample_rate: u32,
    transport: Arc<Transport>,
    statuses: [Arc<TrackStatus>; NUM_BANKS],
    commands: Sender<EngineCommand>,
    engine: EngineHandle,
    param_sync: ParamSync,
    timer: Option<TimerHandle>,
    input: Option<InputHandle>,
    tap: Option<HeapCons<f32>>,
    on_capture: Option<CaptureCallback>,
    output: Option<CpalOutput>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Controller {
    /// Create a controller and the engine it feeds. The caller runs the
    /// engine; call [`tick`](Self::tick) or [`start_timer`](Self::start_timer)
    /// to drive the sequencer.
    pub fn new(config: Config, sample_rate: u32) -> (Self, Engine) {
        let (engine, handle) = Engine::new(config.engine_settings(sample_rate));
        let sample_rate = engine.sample_rate();
        let renderer = VoiceRenderer::new(sample_rate, config.render_settings());
        let sequencer = Sequencer::new(handle.clock.clone(), renderer, config.scheduler_settings());
        let statuses = core::array::from_fn(|i| sequencer.track_status(BankId::new(i)));
        let transport = Arc::new(Transport {
            project: ArcSwap::from_pointee(Project::new()),
            sequencer: Mutex::new(sequencer),
        });

        let mut controller = Self {
            param_sync: ParamSync::new(config.param_ramp_frames(sample_rate), sample_rate),
            config,
            sample_rate,
            transport,
            statuses,
            commands: handle.commands.clone(),
            engine: handle,
            timer: None,
            input: None,
            tap: None,
            on_capture: None,
            output: None,
        };
        controller.sync_mixer();
        (controller, engine)
    }

    /// Open the default output device, hand it the engine and start the
    /// lookahead timer.
    pub fn with_output(config: Config) -> Result<Self, ControllerError> {
        let mut output = CpalOutput::new()?;
        let (mut controller, engine) = Self::new(config, output.sample_rate());
        output.attach(engine)?;
        output.start()?;
        controller.output = Some(output);
        controller.start_timer();
        info!(sample_rate = controller.sample_rate, "audio output running");
        Ok(controller)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    // --- Lookahead loop ---

    /// Run the lookahead loop on its own thread.
    pub fn start_timer(&mut self) {
        if self.timer.is_some() {
            return;
        }
        let interval = Duration::from_millis(self.config.timer_interval_ms.max(1));
        self.timer = Some(TimerHandle::spawn(
            self.transport.clone(),
            self.commands.clone(),
            self.engine.garbage.clone(),
            interval,
        ));
    }

    pub fn stop_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
    }

    /// One lookahead pass on the calling thread, for callers that drive
    /// the engine themselves.
    pub fn tick(&mut self) {
        self.transport.tick(&mut self.commands);
        self.engine.collect_garbage();
    }

    // --- Project ---

    /// The current project snapshot.
    pub fn project(&self) -> Arc<Project> {
        self.transport.project.load_full()
    }

    /// Replace the project. Mixer changes reach the engine as ramps; pattern
    /// changes are picked up by the next lookahead pass.
    pub fn update_project(&mut self, project: Project) {
        self.transport.project.store(Arc::new(project));
        self.sync_mixer();
    }

    fn modify_project(&mut self, f: impl FnOnce(&mut Project)) {
        let mut next = Project::clone(&self.transport.project.load());
        f(&mut next);
        self.update_project(next);
    }

    fn sync_mixer(&mut self) {
        let project = self.transport.project.load();
        let at = self.engine.clock.frames();
        self.param_sync.sync(&project, at, &mut self.commands);
    }

    pub fn set_tempo(&mut self, bpm: f32) {
        self.modify_project(|p| p.tempo = bpm);
        let project = self.project();
        info!(bpm = project.clamped_tempo(), "tempo set");
    }

    /// Decode WAV bytes into `slot`. On error the slot keeps its buffer.
    pub fn load_sample(&mut self, slot: SlotId, bytes: &[u8]) -> Result<(), ControllerError> {
        let buffer = pl_formats::load_wav(bytes)?;
        self.load_buffer(slot, buffer);
        Ok(())
    }

    /// Install `buffer` in `slot`. Sounding voices keep the buffer they
    /// started with.
    pub fn load_buffer(&mut self, slot: SlotId, buffer: SampleBuffer) {
        info!(slot = slot.index(), frames = buffer.frames(), rate = buffer.sample_rate(), "sample loaded");
        let buffer = Arc::new(buffer);
        self.modify_project(|p| p.slots.get_mut(slot).buffer = Some(buffer));
    }

    /// Write a live-played note into `slot`'s lane of its bank's current
    /// pattern, at the step the bank's track is playing.
    pub fn record_step(&mut self, slot: SlotId, note: u8, velocity: u8) {
        let bank = slot.bank();
        let step = self.track_snapshot(bank).position.pattern_step();
        self.modify_project(|p| {
            let pattern = p.bank(bank).pattern;
            p.patterns_mut().get_mut(pattern).record_step(slot.lane(), step, note, velocity);
        });
    }

    // --- Pads and transport ---

    /// Trigger `slot` now, or at `time` seconds on the audio timeline.
    /// Returns `None` if the slot has nothing to play.
    pub fn trigger_pad(&mut self, slot: SlotId, time: Option<f64>, overrides: &ParamOverrides) -> Option<VoiceHandle> {
        let project = self.transport.project.load();
        lock(&self.transport.sequencer).trigger_pad(slot, time, overrides, &project, &mut self.commands)
    }

    /// Start or stop every bank's pattern track. Stopping cancels triggers
    /// that have not started; sounding voices play out.
    pub fn set_transport_playing(&mut self, playing: bool) {
        let project = self.transport.project.load();
        lock(&self.transport.sequencer).set_playing(playing, &project, &mut self.commands);
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.transport.sequencer).is_playing()
    }

    // --- Queries ---

    /// Published position of `bank`'s track.
    pub fn track_snapshot(&self, bank: BankId) -> TrackSnapshot {
        self.statuses[bank.index()].snapshot()
    }

    pub fn voice_count(&self) -> usize {
        self.engine.stats.voice_count()
    }

    pub fn slot_voice_count(&self, slot: SlotId) -> usize {
        self.engine.stats.slot_voice_count(slot)
    }

    /// Time spent rendering the last block over the block's duration.
    pub fn render_load(&self) -> f32 {
        self.engine.stats.load()
    }

    pub fn recorder_state(&self) -> RecorderState {
        self.input.as_ref().map_or(RecorderState::Idle, |input| input.recorder().state())
    }

    // --- Recording ---

    pub fn set_on_capture(&mut self, callback: impl FnMut(SlotId, &SampleBuffer) + Send + 'static) {
        self.on_capture = Some(Box::new(callback));
    }

    /// Feed the recorder from `consumer` instead of the default input
    /// device. Replaces any input already attached.
    pub fn attach_input(&mut self, consumer: HeapCons<f32>, sample_rate: u32) {
        let settings = self.config.recorder_settings(sample_rate);
        self.input = Some(InputHandle::spawn(consumer, settings, sample_rate, None));
    }

    /// Wait for input to cross the threshold, then record. Opens the
    /// default input device on first use; a device error is returned and
    /// the controller stays usable.
    pub fn arm_recording(&mut self) -> Result<(), ControllerError> {
        if self.input.is_none() {
            let ring = HeapRb::<f32>::new(self.config.recorder.input_ring_capacity.max(1));
            let (producer, consumer) = ring.split();
            let device = CpalInput::open(producer).map_err(|e| {
                warn!("cannot open input device: {}", e);
                e
            })?;
            let rate = device.sample_rate();
            let settings = self.config.recorder_settings(rate);
            self.input = Some(InputHandle::spawn(consumer, settings, rate, Some(device)));
        }
        if let Some(input) = &self.input {
            input.recorder().arm();
        }
        Ok(())
    }

    /// Leave the armed state without recording.
    pub fn cancel_recording(&mut self) -> bool {
        self.input.as_ref().is_some_and(|input| input.recorder().cancel())
    }

    /// Finish the take and load it into the selected slot. Returns the slot
    /// if anything was captured.
    pub fn stop_recording(&mut self) -> Option<SlotId> {
        let buffer = self.input.as_ref()?.recorder().stop()?;
        Some(self.deliver_capture(buffer))
    }

    fn deliver_capture(&mut self, buffer: SampleBuffer) -> SlotId {
        let slot = self.project().selected_slot;
        if let Some(callback) = self.on_capture.as_mut() {
            callback(slot, &buffer);
        }
        self.load_buffer(slot, buffer);
        slot
    }

    // --- Resampling ---

    /// Start capturing the master output, up to `max_seconds`.
    pub fn start_resampling(&mut self, max_seconds: f64) {
        let frames = pl_engine::seconds_to_frames(max_seconds, self.sample_rate) as usize;
        let ring = HeapRb::<f32>::new((frames * 2).max(2));
        let (producer, consumer) = ring.split();
        self.send(EngineCommand::Tap(Some(producer)));
        self.tap = Some(consumer);
        info!(max_seconds, "resampling started");
    }

    /// Detach the output tap and load what it captured into the selected
    /// slot.
    pub fn stop_resampling(&mut self) -> Option<SlotId> {
        let mut consumer = self.tap.take()?;
        self.send(EngineCommand::Tap(None));
        let mut interleaved = vec![0.0f32; consumer.occupied_len()];
        let n = consumer.pop_slice(&mut interleaved);
        interleaved.truncate(n - n % 2);
        if interleaved.is_empty() {
            return None;
        }
        let buffer = SampleBuffer::from_interleaved(&interleaved, 2, self.sample_rate);
        Some(self.deliver_capture(buffer))
    }

    fn send(&mut self, command: EngineCommand) {
        pl_engine::CommandSink::send(&mut self.commands, command);
    }

    // --- Offline rendering ---

    /// Render the current project offline at the configured rate.
    pub fn render_offline(&self, seconds: f64) -> SampleBuffer {
        offline::render_offline(&self.project(), seconds, &self.config)
    }

    pub fn render_to_wav(&self, seconds: f64) -> Vec<u8> {
        pl_formats::wav_bytes(&self.render_offline(seconds))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop_timer();
        self.input = None;
        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.stop() {
                warn!("failed to stop output: {}", e);
            }
        }
    }
}
