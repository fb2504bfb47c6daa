//! The lookahead timer thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use pl_engine::{EngineCommand, FrameClock, Garbage, Sequencer};
use pl_ir::Project;
use tracing::debug;

/// State shared by the control API and the timer thread.
pub(crate) struct Transport {
    pub project: ArcSwap<Project>,
    pub sequencer: Mutex<Sequencer<FrameClock>>,
}

impl Transport {
    /// Run one scheduling pass against the current project.
    pub fn tick(&self, sink: &mut Sender<EngineCommand>) {
        let project = self.project.load();
        self.sequencer.lock().unwrap_or_else(PoisonError::into_inner).tick(&project, sink);
    }
}

pub(crate) struct TimerHandle {
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn spawn(
        transport: Arc<Transport>,
        mut commands: Sender<EngineCommand>,
        garbage: Receiver<Garbage>,
        interval: Duration,
    ) -> Self {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let thread = std::thread::spawn(move || {
            debug!(interval_ms = interval.as_millis() as u64, "lookahead timer started");
            while !stop.load(Ordering::Relaxed) {
                transport.tick(&mut commands);
                let _ = garbage.try_iter().count();
                std::thread::sleep(interval);
            }
            debug!("lookahead timer stopped");
        });
        Self { stop_signal, thread: Some(thread) }
    }

    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
