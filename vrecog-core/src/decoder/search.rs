//! Frame-synchronous decoder
//!
//! Each frame is scored into a posterior over acoustic units. Confident,
//! voiced frames extend the current word segment while the same unit keeps
//! winning; a different unit or a long enough pause closes it. Closed
//! segments become lattice slots after the search graph has constrained
//! their word distribution.

use crate::audio::{FeatureFrame, FeaturePipeline};
use crate::config::{DecodingConfig, ModelConfig};
use crate::decoder::lattice::{HypWord, Lattice, LatticeSlot};
use crate::decoder::weighting::SilenceWeighting;
use crate::decoder::DecoderEngine;
use crate::model::{AcousticModel, SearchGraph, WordId};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct OpenSegment {
    unit: usize,
    start_frame: usize,
    last_voiced: usize,
    voiced_frames: usize,
    posterior_sum: Vec<f32>,
}

#[derive(Debug, Clone)]
struct ClosedSegment {
    start_frame: usize,
    end_frame: usize,
    candidates: Vec<(WordId, f32)>,
}

pub struct FrameSyncDecoder {
    unit_words: Vec<WordId>,
    graph: Arc<SearchGraph>,
    decoding: DecodingConfig,
    weighting: SilenceWeighting,
    weights: Vec<f32>,
    open: Option<OpenSegment>,
    closed: Vec<ClosedSegment>,
    nonsilence_seen: bool,
    trailing_silence: usize,
    finalized: bool,
}

impl FrameSyncDecoder {
    pub fn new(acoustic: &AcousticModel, graph: Arc<SearchGraph>, config: &ModelConfig) -> Self {
        Self {
            unit_words: acoustic.units().iter().map(|u| u.word_id).collect(),
            graph,
            decoding: config.decoding.clone(),
            weighting: SilenceWeighting::new(&config.features, &config.silence_weighting),
            weights: Vec::new(),
            open: None,
            closed: Vec::new(),
            nonsilence_seen: false,
            trailing_silence: 0,
            finalized: false,
        }
    }

    fn posteriors(&self, bands_db: &[f32]) -> Vec<f32> {
        let scale = self.decoding.posterior_scale;
        let max = bands_db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = bands_db.iter().map(|b| ((b - max) * scale).exp()).collect();
        let total: f32 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }

    fn decode_frame(&mut self, index: usize, frame: &FeatureFrame) {
        let posteriors = self.posteriors(&frame.bands_db);
        let (best_unit, best_p) = posteriors
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((0, 0.0));

        let weight = self.weighting.frame_weight(frame.log_energy_db, best_p);
        self.weights.push(weight);

        if self.weighting.is_speech(weight) {
            self.nonsilence_seen = true;
            self.trailing_silence = 0;

            match self.open.as_mut() {
                Some(seg) if seg.unit == best_unit => {
                    seg.last_voiced = index;
                    seg.voiced_frames += 1;
                    seg.posterior_sum
                        .iter_mut()
                        .zip(&posteriors)
                        .for_each(|(acc, p)| *acc += p);
                }
                _ => {
                    self.close_segment();
                    self.open = Some(OpenSegment {
                        unit: best_unit,
                        start_frame: index,
                        last_voiced: index,
                        voiced_frames: 1,
                        posterior_sum: posteriors,
                    });
                }
            }
        } else {
            self.trailing_silence += 1;
            let gap_exceeded = self
                .open
                .as_ref()
                .is_some_and(|seg| index - seg.last_voiced > self.decoding.max_gap_frames);
            if gap_exceeded {
                self.close_segment();
            }
        }
    }

    /// Graph-constrained word distribution of a segment, if it is long
    /// enough and the graph accepts any of its words
    fn resolve(&self, seg: &OpenSegment) -> Option<ClosedSegment> {
        if seg.voiced_frames < self.decoding.min_word_frames {
            return None;
        }
        let avg: Vec<f32> = seg
            .posterior_sum
            .iter()
            .map(|s| s / seg.voiced_frames as f32)
            .collect();
        let mut candidates = self.graph.constrain(&self.unit_words, &avg)?;
        candidates.truncate(self.decoding.max_candidates);

        Some(ClosedSegment {
            start_frame: seg.start_frame,
            end_frame: seg.last_voiced + 1,
            candidates,
        })
    }

    fn close_segment(&mut self) {
        if let Some(seg) = self.open.take() {
            match self.resolve(&seg) {
                Some(closed) => self.closed.push(closed),
                None => tracing::trace!(
                    "Dropped segment at frame {} ({} voiced frames)",
                    seg.start_frame,
                    seg.voiced_frames
                ),
            }
        }
    }

    fn to_word(seg: &ClosedSegment) -> HypWord {
        HypWord {
            word: seg.candidates[0].0,
            start_frame: seg.start_frame,
            end_frame: seg.end_frame,
            confidence: seg.candidates[0].1,
        }
    }
}

impl DecoderEngine for FrameSyncDecoder {
    fn advance_decoding(&mut self, features: &dyn FeaturePipeline) {
        if self.finalized {
            return;
        }
        let ready = features.num_frames_ready();
        for index in self.weights.len()..ready {
            if let Some(frame) = features.frame(index) {
                self.decode_frame(index, frame);
            }
        }
    }

    fn finalize_decoding(&mut self) {
        if !self.finalized {
            self.close_segment();
            self.finalized = true;
        }
    }

    fn num_frames_decoded(&self) -> usize {
        self.weights.len()
    }

    fn trailing_silence_frames(&self) -> usize {
        self.trailing_silence
    }

    fn contains_nonsilence(&self) -> bool {
        self.nonsilence_seen
    }

    fn frame_weights(&self) -> &[f32] {
        &self.weights
    }

    fn best_path(&self) -> Vec<HypWord> {
        let mut words: Vec<HypWord> = self.closed.iter().map(Self::to_word).collect();
        if let Some(open) = self.open.as_ref().and_then(|seg| self.resolve(seg)) {
            words.push(Self::to_word(&open));
        }
        words
    }

    fn completed_words(&self) -> Vec<HypWord> {
        self.closed.iter().map(Self::to_word).collect()
    }

    fn lattice(&self) -> Lattice {
        let mut segments = self.closed.clone();
        if !self.finalized {
            if let Some(open) = self.open.as_ref().and_then(|seg| self.resolve(seg)) {
                segments.push(open);
            }
        }
        Lattice::new(
            segments
                .into_iter()
                .map(|seg| LatticeSlot {
                    start_frame: seg.start_frame,
                    end_frame: seg.end_frame,
                    candidates: seg.candidates,
                })
                .collect(),
        )
    }
}
