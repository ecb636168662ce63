//! Recognition results and their JSON wire format

mod formatter;
pub mod schema;

pub use formatter::ResultFormatter;
pub use schema::{
    Alternative, AlternativesResult, ErrorResult, FinalResult, KwsResult, PartialResult, WordResult,
};

use crate::decoder::Lattice;
use crate::model::{SpeakerEmbedding, SymbolTable};
use std::sync::Arc;

/// Maps frame indices of one utterance to absolute stream time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Stream sample at which the utterance's first frame starts
    pub start_sample: u64,
    pub shift_samples: usize,
    pub sample_rate: f32,
}

impl FrameTiming {
    pub fn seconds(&self, frame: usize) -> f64 {
        (self.start_sample + (frame * self.shift_samples) as u64) as f64 / self.sample_rate as f64
    }
}

/// A finalized utterance, kept until the next one starts
#[derive(Debug, Clone)]
pub struct Utterance {
    pub lattice: Lattice,
    pub symbols: Arc<SymbolTable>,
    pub timing: FrameTiming,
    pub speaker: Option<SpeakerEmbedding>,
}

/// Last wake phrase found by a keyword-spotting track
#[derive(Debug, Clone, PartialEq)]
pub struct WakeDetection {
    pub phrase: String,
    /// Seconds from stream start
    pub start: f64,
    pub end: f64,
    pub confidence: f32,
}
