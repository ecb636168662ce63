//! Track state machine
//!
//! One transition table shared by keyword-spotting and recognition tracks.
//!
//! ```text
//! Initialized --Audio--> Running --Endpoint--> Endpoint --Reset--> Initialized
//!      |                    |                      |
//!      +------------------Finalize-----------------+----> Finalized
//! ```

use crate::error::{VRecogError, VRecogResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Keyword spotting over a grammar graph
    Kws,
    /// Full-vocabulary recognition
    Asr,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kws => write!(f, "kws"),
            Self::Asr => write!(f, "asr"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackState {
    /// Waiting for the first chunk of an utterance
    Initialized,
    /// Decoding an utterance
    Running,
    /// Utterance finalized, result pending; resets on the next chunk
    Endpoint,
    /// Stream closed
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEvent {
    Audio,
    Endpoint,
    Reset,
    Finalize,
}

impl TrackState {
    /// Next state, or an error if `event` is not allowed here
    pub fn on(self, kind: TrackKind, event: TrackEvent) -> VRecogResult<TrackState> {
        use TrackEvent as E;
        use TrackState as S;

        match (self, event) {
            (S::Finalized, _) => Err(VRecogError::SessionClosed),
            (S::Initialized | S::Running, E::Audio) => Ok(S::Running),
            (S::Running, E::Endpoint) => Ok(S::Endpoint),
            (S::Initialized | S::Endpoint, E::Reset) => Ok(S::Initialized),
            (_, E::Finalize) => Ok(S::Finalized),
            (from, event) => Err(VRecogError::InvalidTransition {
                track: kind.to_string(),
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_cycle() {
        let kind = TrackKind::Asr;
        let s = TrackState::Initialized;
        let s = s.on(kind, TrackEvent::Audio).unwrap();
        assert_eq!(s, TrackState::Running);
        let s = s.on(kind, TrackEvent::Audio).unwrap();
        let s = s.on(kind, TrackEvent::Endpoint).unwrap();
        assert_eq!(s, TrackState::Endpoint);
        let s = s.on(kind, TrackEvent::Reset).unwrap();
        assert_eq!(s, TrackState::Initialized);
    }

    #[test]
    fn test_finalize_from_any_open_state() {
        for state in [TrackState::Initialized, TrackState::Running, TrackState::Endpoint] {
            assert_eq!(
                state.on(TrackKind::Kws, TrackEvent::Finalize).unwrap(),
                TrackState::Finalized
            );
        }
    }

    #[test]
    fn test_finalized_is_closed() {
        for event in [TrackEvent::Audio, TrackEvent::Endpoint, TrackEvent::Reset, TrackEvent::Finalize] {
            assert!(matches!(
                TrackState::Finalized.on(TrackKind::Asr, event),
                Err(VRecogError::SessionClosed)
            ));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let err = TrackState::Endpoint
            .on(TrackKind::Kws, TrackEvent::Audio)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid state transition: kws Endpoint + Audio");

        assert!(TrackState::Initialized.on(TrackKind::Asr, TrackEvent::Endpoint).is_err());
        assert!(TrackState::Running.on(TrackKind::Asr, TrackEvent::Reset).is_err());
    }
}
