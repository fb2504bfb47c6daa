//! CPAL-based audio output backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use pl_engine::Engine;
use tracing::{info, warn};

use crate::traits::{AudioError, AudioOutput};

/// CPAL-based audio output. The device callback owns the engine and
/// renders straight into the device buffer.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl CpalOutput {
    /// Open the default output device. No stream is built yet; create the
    /// engine at [`sample_rate`](AudioOutput::sample_rate) and pass it to
    /// [`attach`](Self::attach).
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let supported = device.default_output_config()?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(AudioError::DeviceConfig(format!(
                "unsupported output sample format {:?}",
                supported.sample_format()
            )));
        }
        let config: StreamConfig = supported.into();
        let name = device.name().unwrap_or_default();
        info!(
            device = %name,
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "opened output device"
        );

        Ok(Self { device, config, stream: None, running: Arc::new(AtomicBool::new(false)) })
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }

    /// Build the output stream around `engine`. The stream stays silent
    /// until [`start`](AudioOutput::start).
    pub fn attach(&mut self, mut engine: Engine) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Err(AudioError::AlreadyRunning);
        }
        let running = self.running.clone();
        let channels = self.channels();

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                engine.process(data, channels);
            },
            |err| warn!("audio output stream error: {}", err),
            None,
        )?;

        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self) -> Result<(), AudioError> {
        if let Some(ref stream) = self.stream {
            stream.play()?;
        }
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.running.store(false, Ordering::Relaxed);
        if let Some(ref stream) = self.stream {
            stream.pause().map_err(|e| AudioError::StreamPlay(e.to_string()))?;
        }
        Ok(())
    }
}
