//! Audio file formats for padloop.
//!
//! Decodes WAV files into [`SampleBuffer`](pl_ir::SampleBuffer)s and writes
//! rendered stereo output back out as 16-bit PCM WAV.

mod wav_format;

pub use wav_format::{load_wav, read_wav_file, wav_bytes, write_wav, write_wav_file};

/// Error type for format parsing.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid file header")]
    InvalidHeader,
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error("unsupported encoding: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
