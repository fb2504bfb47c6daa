//! The recorder thread: drains the input ring buffer into the level
//! recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use pl_audio::CpalInput;
use pl_engine::{LevelRecorder, RecorderSettings};
use ringbuf::traits::Consumer;
use ringbuf::HeapCons;
use tracing::debug;

const DRAIN_CHUNK: usize = 1024;
const IDLE_SLEEP: Duration = Duration::from_millis(5);

pub(crate) struct InputHandle {
    recorder: Arc<Mutex<LevelRecorder>>,
    stop_signal: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    _device: Option<CpalInput>,
}

impl InputHandle {
    /// Start draining `consumer` into a fresh recorder. `device` keeps a
    /// live input stream open for as long as the handle exists.
    pub fn spawn(
        mut consumer: HeapCons<f32>,
        settings: RecorderSettings,
        sample_rate: u32,
        device: Option<CpalInput>,
    ) -> Self {
        let recorder = Arc::new(Mutex::new(LevelRecorder::new(settings, sample_rate)));
        let shared = recorder.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = stop_signal.clone();
        let thread = std::thread::spawn(move || {
            let mut chunk = [0.0f32; DRAIN_CHUNK];
            while !stop.load(Ordering::Relaxed) {
                let n = consumer.pop_slice(&mut chunk);
                if n == 0 {
                    std::thread::sleep(IDLE_SLEEP);
                    continue;
                }
                shared.lock().unwrap_or_else(PoisonError::into_inner).process(&chunk[..n]);
            }
            debug!("recorder thread stopped");
        });
        Self { recorder, stop_signal, thread: Some(thread), _device: device }
    }

    pub fn recorder(&self) -> MutexGuard<'_, LevelRecorder> {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
