//! VRecog Core
//!
//! Streaming speech recognition sessions over shared, reference-counted
//! models: full-vocabulary recognition, grammar-based keyword spotting and
//! automatic handoff from a wake phrase to recognition.
//!
//! ```no_run
//! use vrecog_core::{AudioBuffer, Model, ModelMode, RecognizerSession};
//!
//! # fn main() -> vrecog_core::VRecogResult<()> {
//! let model = Model::load("model", ModelMode::Asr)?;
//! let mut session = RecognizerSession::new(&model, 16000.0)?;
//! let pcm: Vec<i16> = vec![0; 16000];
//! if session.accept_waveform(AudioBuffer::Shorts(&pcm), false)? {
//!     println!("{}", session.result()?);
//! }
//! println!("{}", session.final_result()?);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod audio;
pub mod config;
pub mod decoder;
pub mod endpointing;
pub mod error;
pub mod ffi;
pub mod grammar;
pub mod model;
pub mod recognizer;
pub mod result;
pub mod runtime;

#[cfg(test)]
#[path = "../tests/common/fixtures.rs"]
pub(crate) mod test_util;

// Re-export key types
pub use audio::{AudioBuffer, SampleWidth};
pub use config::ModelConfig;
pub use endpointing::{EndpointDetector, EndpointDetectorConfig, EndpointResult};
pub use error::{VRecogError, VRecogResult};
pub use grammar::Grammar;
pub use model::{Model, ModelMode, SpeakerModel, WeakModel};
pub use recognizer::{RecognizerSession, TrackKind, TrackState};
pub use result::ResultFormatter;
pub use runtime::{init_logging, set_log_level, GpuStatus, Runtime};
