//! Audio device streams for padloop.
//!
//! [`CpalOutput`] hands the [`Engine`](pl_engine::Engine) to the device
//! callback; [`CpalInput`] feeds a mono ring buffer for the recorder.

mod cpal_backend;
mod input;
mod traits;

pub use cpal_backend::CpalOutput;
pub use input::CpalInput;
pub use traits::{AudioError, AudioOutput};
