//! Utterance endpointing
//!
//! Kaldi-style rules on trailing silence and utterance length

mod detector;

pub use detector::{
    DecodeProgress,
    EndpointDetector,
    EndpointDetectorConfig,
    EndpointResult,
};
