//! Controller configuration, loadable from TOML.

use std::path::Path;

use pl_engine::{seconds_to_frames, EngineSettings, RecorderSettings, RenderSettings, SchedulerSettings};
use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Timing, sizing and recorder settings. Every field has a default, so a
/// partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rate used for offline rendering.
    pub sample_rate: u32,
    pub lookahead_ms: f64,
    /// Period of the lookahead timer thread.
    pub timer_interval_ms: u64,
    pub start_delay_ms: f64,
    /// Ramp applied to mixer changes.
    pub param_ramp_ms: f64,
    pub voice_ramp_ms: f64,
    pub voice_release_ms: f64,
    /// Bound of the engine command channel and timed queue.
    pub queue_capacity: usize,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Linear peak that starts a take.
    pub threshold: f32,
    pub window_ms: f64,
    pub pre_roll_ms: f64,
    pub max_seconds: f64,
    /// Samples buffered between the input callback and the recorder thread.
    pub input_ring_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            lookahead_ms: 100.0,
            timer_interval_ms: 25,
            start_delay_ms: 50.0,
            param_ramp_ms: 10.0,
            voice_ramp_ms: 5.0,
            voice_release_ms: 20.0,
            queue_capacity: 1024,
            recorder: RecorderConfig::default(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            window_ms: 10.0,
            pre_roll_ms: 5.0,
            max_seconds: 30.0,
            input_ring_capacity: 1 << 17,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ControllerError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ControllerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            lookahead: self.lookahead_ms.max(0.0) / 1000.0,
            start_delay: self.start_delay_ms.max(0.0) / 1000.0,
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            ramp_seconds: self.voice_ramp_ms.max(0.0) / 1000.0,
            release_seconds: self.voice_release_ms.max(0.0) / 1000.0,
            ..RenderSettings::default()
        }
    }

    pub fn engine_settings(&self, sample_rate: u32) -> EngineSettings {
        EngineSettings {
            queue_capacity: self.queue_capacity.max(1),
            ..EngineSettings::new(sample_rate)
        }
    }

    pub fn param_ramp_frames(&self, sample_rate: u32) -> u32 {
        seconds_to_frames(self.param_ramp_ms / 1000.0, sample_rate) as u32
    }

    pub fn recorder_settings(&self, sample_rate: u32) -> RecorderSettings {
        let r = &self.recorder;
        RecorderSettings {
            threshold: r.threshold.max(0.0),
            window: (seconds_to_frames(r.window_ms / 1000.0, sample_rate) as usize).max(1),
            pre_roll: seconds_to_frames(r.pre_roll_ms / 1000.0, sample_rate) as usize,
            max_samples: seconds_to_frames(r.max_seconds, sample_rate) as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_timing_model() {
        let config = Config::default();
        let scheduler = config.scheduler_settings();
        assert!((scheduler.lookahead - 0.1).abs() < 1e-9);
        assert!((scheduler.start_delay - 0.05).abs() < 1e-9);
        assert_eq!(config.timer_interval_ms, 25);
        assert_eq!(config.param_ramp_frames(48000), 480);
        let render = config.render_settings();
        assert!((render.ramp_seconds - 0.005).abs() < 1e-9);
        assert!((render.release_seconds - 0.020).abs() < 1e-9);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let toml_str = r#"
            lookahead_ms = 150.0

            [recorder]
            threshold = 0.2
        "#;
        let config = Config::from_toml(toml_str).unwrap();
        assert!((config.lookahead_ms - 150.0).abs() < 1e-9);
        assert_eq!(config.timer_interval_ms, 25);
        assert!((config.recorder.threshold - 0.2).abs() < f32::EPSILON);
        assert!((config.recorder.window_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn recorder_settings_scale_with_rate() {
        let settings = Config::default().recorder_settings(44100);
        assert_eq!(settings.window, 441);
        assert_eq!(settings.pre_roll, 221);
        assert_eq!(settings.max_samples, 44100 * 30);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(matches!(Config::from_toml("lookahead_ms = \"soon\""), Err(ControllerError::Config(_))));
    }
}
