//! C ABI
//!
//! Opaque handles over [`Model`](crate::model::Model),
//! [`SpeakerModel`](crate::model::SpeakerModel) and
//! [`RecognizerSession`](crate::recognizer::RecognizerSession). Every export
//! catches panics at the boundary; failures are logged and reported as a
//! null handle, a negative code or an error JSON.

pub mod exports;
pub mod safety;
pub mod types;

pub use exports::*;
pub use types::*;
