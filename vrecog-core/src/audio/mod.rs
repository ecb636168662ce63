//! Audio ingestion and feature extraction
//!
//! Caller buffers are normalised into a canonical waveform, then framed into
//! acoustic features by a [`FeaturePipeline`].

pub mod features;
pub mod ingest;

pub use features::{FeatureFrame, FeaturePipeline, FilterbankPipeline};
pub use ingest::{AudioBuffer, SampleWidth};
