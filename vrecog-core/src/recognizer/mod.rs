//! Streaming recognizer sessions

mod session;
mod speaker;
mod state;
mod track;

pub use session::RecognizerSession;
pub use state::{TrackEvent, TrackKind, TrackState};
