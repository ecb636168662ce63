//! Silence weighting
//!
//! Quiet frames and frames the acoustic scorer is unsure about get a small
//! weight. Down-weighted frames count as silence for endpointing and are
//! left out of speaker statistics.

use crate::config::{FeatureConfig, SilenceWeightingConfig};

#[derive(Debug, Clone)]
pub struct SilenceWeighting {
    floor_db: f32,
    silence_weight: f32,
    min_confidence: f32,
}

impl SilenceWeighting {
    pub fn new(features: &FeatureConfig, config: &SilenceWeightingConfig) -> Self {
        Self {
            floor_db: features.silence_floor_db,
            silence_weight: config.silence_weight,
            min_confidence: config.min_confidence,
        }
    }

    /// Weight of one frame given its best unit posterior
    pub fn frame_weight(&self, log_energy_db: f32, best_posterior: f32) -> f32 {
        if log_energy_db < self.floor_db || best_posterior < self.min_confidence {
            self.silence_weight
        } else {
            best_posterior
        }
    }

    pub fn is_speech(&self, weight: f32) -> bool {
        weight > self.silence_weight
    }
}
