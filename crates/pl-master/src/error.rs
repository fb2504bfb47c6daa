//! Controller error type.

use pl_audio::AudioError;
use pl_formats::FormatError;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("audio device: {0}")]
    Audio(#[from] AudioError),
    #[error("sample decode: {0}")]
    Format(#[from] FormatError),
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
