//! Decoding: search engine, silence weighting, lattices

pub mod lattice;
pub mod search;
pub mod weighting;

pub use lattice::{HypWord, Hypothesis, Lattice, LatticeSlot};
pub use search::FrameSyncDecoder;
pub use weighting::SilenceWeighting;

use crate::audio::FeaturePipeline;

/// Frame-synchronous search over one utterance.
///
/// An engine is bound to one search graph and one utterance; a new engine
/// is created for the next utterance.
pub trait DecoderEngine: Send {
    /// Decode every frame the pipeline has ready that is not decoded yet
    fn advance_decoding(&mut self, features: &dyn FeaturePipeline);

    /// Close the search; no frames are decoded afterwards
    fn finalize_decoding(&mut self);

    fn num_frames_decoded(&self) -> usize;

    /// Frames since the last speech frame (all frames if none)
    fn trailing_silence_frames(&self) -> usize;

    fn contains_nonsilence(&self) -> bool;

    /// Per-frame silence weights, one per decoded frame
    fn frame_weights(&self) -> &[f32];

    /// Current best hypothesis, including a word still in progress
    fn best_path(&self) -> Vec<HypWord>;

    /// Words whose span can no longer change
    fn completed_words(&self) -> Vec<HypWord>;

    fn lattice(&self) -> Lattice;
}
