//! Per-utterance speaker feature accumulation

use crate::audio::{FeaturePipeline, FilterbankPipeline};
use crate::config::FeatureConfig;
use crate::model::{SpeakerEmbedding, SpeakerModel};

/// Speaker filterbank running alongside a track's decoding pipeline. Both
/// use the same framing, so frame `i` here lines up with decoder frame `i`.
pub(crate) struct SpeakerFeatures {
    model: SpeakerModel,
    pipeline: FilterbankPipeline,
}

impl SpeakerFeatures {
    pub fn new(model: SpeakerModel, sample_rate: f32, features: &FeatureConfig) -> Self {
        Self {
            pipeline: FilterbankPipeline::new(sample_rate, features, &SpeakerModel::band_centers()),
            model,
        }
    }

    pub fn accept_waveform(&mut self, samples: &[f32]) {
        self.pipeline.accept_waveform(samples);
    }

    pub fn input_finished(&mut self) {
        self.pipeline.input_finished();
    }

    pub fn embedding(&self, frame_weights: &[f32]) -> SpeakerEmbedding {
        self.model.extract(self.pipeline.frames(), frame_weights)
    }
}
