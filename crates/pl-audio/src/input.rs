//! CPAL input monitor: downmixes the default input device to mono and
//! pushes it into a ring buffer for the recorder thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::Producer;
use ringbuf::HeapProd;
use tracing::{info, warn};

use crate::traits::AudioError;

pub struct CpalInput {
    sample_rate: u32,
    _stream: Stream,
}

impl CpalInput {
    /// Open the default input device and start streaming into `producer`.
    /// Samples that do not fit are dropped.
    pub fn open(producer: HeapProd<f32>) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AudioError::NoDevice)?;
        let supported = device.default_input_config()?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, producer)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, producer)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, producer)?,
            SampleFormat::I32 => build_stream::<i32>(&device, &config, producer)?,
            other => {
                return Err(AudioError::DeviceConfig(format!("unsupported input sample format {:?}", other)));
            }
        };
        stream.play()?;

        info!(sample_rate = config.sample_rate.0, channels = config.channels, "opened input device");
        Ok(Self { sample_rate: config.sample_rate.0, _stream: stream })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn build_stream<T>(device: &Device, config: &StreamConfig, mut producer: HeapProd<f32>) -> Result<Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    let scale = 1.0 / channels as f32;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            for frame in data.chunks(channels) {
                let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                let _ = producer.try_push(sum * scale);
            }
        },
        |err| warn!("audio input stream error: {}", err),
        None,
    )?;
    Ok(stream)
}
