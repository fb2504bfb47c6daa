//! Threshold-triggered capture of live input into a sample buffer.
//!
//! Input is analysed in fixed windows while armed. The first window whose
//! peak exceeds the threshold starts the recording; capture begins at the
//! first sample over the threshold, less a short pre-roll, so the attack
//! is never clipped.

use std::collections::VecDeque;

use pl_ir::SampleBuffer;
use tracing::{debug, info};

/// Recorder lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecorderState {
    #[default]
    Idle,
    Armed,
    Recording,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecorderSettings {
    /// Linear peak level that starts a recording.
    pub threshold: f32,
    /// Samples per analysis window.
    pub window: usize,
    /// Samples kept before the crossing.
    pub pre_roll: usize,
    /// Hard limit on a single take, in samples.
    pub max_samples: usize,
}

impl RecorderSettings {
    pub fn for_rate(sample_rate: u32) -> Self {
        Self {
            threshold: 0.05,
            window: (sample_rate as usize / 100).max(1),
            pre_roll: sample_rate as usize / 200,
            max_samples: sample_rate as usize * 30,
        }
    }
}

/// Mono input recorder driven by [`process`](Self::process).
#[derive(Debug)]
pub struct LevelRecorder {
    state: RecorderState,
    settings: RecorderSettings,
    sample_rate: u32,
    history: VecDeque<f32>,
    window_fill: usize,
    window_peak: f32,
    captured: Vec<f32>,
}

impl LevelRecorder {
    pub fn new(settings: RecorderSettings, sample_rate: u32) -> Self {
        let window = settings.window.max(1);
        Self {
            state: RecorderState::Idle,
            settings: RecorderSettings { window, ..settings },
            sample_rate,
            history: VecDeque::with_capacity(window + settings.pre_roll),
            window_fill: 0,
            window_peak: 0.0,
            captured: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Samples captured so far in the current take.
    pub fn captured_len(&self) -> usize {
        self.captured.len()
    }

    /// IDLE → ARMED. Returns false in any other state.
    pub fn arm(&mut self) -> bool {
        if self.state != RecorderState::Idle {
            return false;
        }
        self.history.clear();
        self.window_fill = 0;
        self.window_peak = 0.0;
        self.captured.clear();
        self.state = RecorderState::Armed;
        debug!(threshold = self.settings.threshold, "recorder armed");
        true
    }

    /// ARMED → IDLE without recording. Returns false in any other state.
    pub fn cancel(&mut self) -> bool {
        if self.state != RecorderState::Armed {
            return false;
        }
        self.state = RecorderState::Idle;
        self.history.clear();
        debug!("recorder disarmed");
        true
    }

    /// Feed input samples.
    pub fn process(&mut self, input: &[f32]) {
        let mut rest = input;
        while !rest.is_empty() {
            match self.state {
                RecorderState::Idle => return,
                RecorderState::Armed => {
                    let take = (self.settings.window - self.window_fill).min(rest.len());
                    let (chunk, tail) = rest.split_at(take);
                    rest = tail;
                    self.analyse(chunk);
                }
                RecorderState::Recording => {
                    let room = self.settings.max_samples.saturating_sub(self.captured.len());
                    let take = room.min(rest.len());
                    self.captured.extend_from_slice(&rest[..take]);
                    return;
                }
            }
        }
    }

    fn analyse(&mut self, chunk: &[f32]) {
        for &s in chunk {
            self.history.push_back(s);
            self.window_peak = self.window_peak.max(s.abs());
        }
        let limit = self.settings.window + self.settings.pre_roll;
        while self.history.len() > limit {
            self.history.pop_front();
        }
        self.window_fill += chunk.len();
        if self.window_fill < self.settings.window {
            return;
        }

        if self.window_peak > self.settings.threshold {
            let window_start = self.history.len().saturating_sub(self.settings.window);
            let crossing = self
                .history
                .iter()
                .skip(window_start)
                .position(|s| s.abs() > self.settings.threshold)
                .map_or(window_start, |i| window_start + i);
            let from = crossing.saturating_sub(self.settings.pre_roll);
            self.captured.clear();
            self.captured.extend(self.history.iter().skip(from));
            self.history.clear();
            self.state = RecorderState::Recording;
            info!(peak = self.window_peak, "recording started");
        }
        self.window_fill = 0;
        self.window_peak = 0.0;
    }

    /// Finish the take. RECORDING → IDLE yields the captured audio;
    /// ARMED → IDLE yields nothing.
    pub fn stop(&mut self) -> Option<SampleBuffer> {
        match self.state {
            RecorderState::Idle => None,
            RecorderState::Armed => {
                self.cancel();
                None
            }
            RecorderState::Recording => {
                self.state = RecorderState::Idle;
                let data = core::mem::take(&mut self.captured);
                info!(samples = data.len(), "recording finished");
                if data.is_empty() {
                    return None;
                }
                Some(SampleBuffer::mono(data, self.sample_rate))
            }
        }
    }
}
