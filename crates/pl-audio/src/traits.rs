//! Audio output trait and error types.

use cpal::{BuildStreamError, DefaultStreamConfigError, PlayStreamError};

/// Error type for audio device operations.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio device available")]
    NoDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The platform refused access, typically to the microphone.
    #[error("audio device access denied: {0}")]
    Permission(String),
    #[error("output stream already running")]
    AlreadyRunning,
}

fn looks_like_permission(description: &str) -> bool {
    let lower = description.to_ascii_lowercase();
    lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
}

impl From<DefaultStreamConfigError> for AudioError {
    fn from(err: DefaultStreamConfigError) -> Self {
        match err {
            DefaultStreamConfigError::DeviceNotAvailable => AudioError::NoDevice,
            DefaultStreamConfigError::BackendSpecific { err } if looks_like_permission(&err.description) => {
                AudioError::Permission(err.description)
            }
            other => AudioError::DeviceConfig(other.to_string()),
        }
    }
}

impl From<BuildStreamError> for AudioError {
    fn from(err: BuildStreamError) -> Self {
        match err {
            BuildStreamError::DeviceNotAvailable => AudioError::NoDevice,
            BuildStreamError::BackendSpecific { err } if looks_like_permission(&err.description) => {
                AudioError::Permission(err.description)
            }
            other => AudioError::StreamBuild(other.to_string()),
        }
    }
}

impl From<PlayStreamError> for AudioError {
    fn from(err: PlayStreamError) -> Self {
        match err {
            PlayStreamError::DeviceNotAvailable => AudioError::NoDevice,
            other => AudioError::StreamPlay(other.to_string()),
        }
    }
}

/// A device stream that can be started and stopped.
pub trait AudioOutput {
    /// Device rate the engine must render at.
    fn sample_rate(&self) -> u32;

    fn start(&mut self) -> Result<(), AudioError>;

    /// Stop producing audio. The stream keeps its engine.
    fn stop(&mut self) -> Result<(), AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpal::BackendSpecificError;

    fn backend(description: &str) -> BackendSpecificError {
        BackendSpecificError { description: description.to_string() }
    }

    #[test]
    fn missing_device_maps_to_no_device() {
        assert!(matches!(AudioError::from(BuildStreamError::DeviceNotAvailable), AudioError::NoDevice));
        assert!(matches!(AudioError::from(PlayStreamError::DeviceNotAvailable), AudioError::NoDevice));
    }

    #[test]
    fn denied_access_maps_to_permission() {
        let err = AudioError::from(BuildStreamError::BackendSpecific { err: backend("Permission denied") });
        assert!(matches!(err, AudioError::Permission(_)));
    }

    #[test]
    fn other_backend_errors_keep_their_kind() {
        let err = AudioError::from(BuildStreamError::BackendSpecific { err: backend("buffer underrun") });
        assert!(matches!(err, AudioError::StreamBuild(_)));
        let err = AudioError::from(DefaultStreamConfigError::StreamTypeNotSupported);
        assert!(matches!(err, AudioError::DeviceConfig(_)));
    }
}
