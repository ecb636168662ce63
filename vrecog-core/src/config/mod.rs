//! Model configuration
//!
//! Decoding parameters shipped with each resource directory in
//! `conf/model.toml`. Every field has a default so the file is optional.

use crate::error::{VRecogError, VRecogResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete per-model configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub decoding: DecodingConfig,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub silence_weighting: SilenceWeightingConfig,
    #[serde(default)]
    pub rescoring: RescoringConfig,
}

/// Feature extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Frame shift (ms)
    pub frame_shift_ms: u32,
    /// Analysis window length (ms)
    pub frame_length_ms: u32,
    /// Frames quieter than this (dBFS) are silence
    pub silence_floor_db: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            frame_shift_ms: 10,
            frame_length_ms: 25,
            silence_floor_db: -45.0,
        }
    }
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingConfig {
    /// Shorter unit runs are discarded as noise
    pub min_word_frames: usize,
    /// Silence frames tolerated inside one word
    pub max_gap_frames: usize,
    /// Scale applied to band powers (per dB) before the softmax
    pub posterior_scale: f32,
    /// Candidates kept per lattice slot
    pub max_candidates: usize,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            min_word_frames: 3,
            max_gap_frames: 8,
            posterior_scale: 0.3,
            max_candidates: 8,
        }
    }
}

/// One endpointing rule, evaluated on audio time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRule {
    #[serde(default)]
    pub must_contain_nonsilence: bool,
    #[serde(default)]
    pub min_trailing_silence_s: f32,
    #[serde(default)]
    pub min_utterance_length_s: f32,
}

impl EndpointRule {
    pub const fn new(
        must_contain_nonsilence: bool,
        min_trailing_silence_s: f32,
        min_utterance_length_s: f32,
    ) -> Self {
        Self {
            must_contain_nonsilence,
            min_trailing_silence_s,
            min_utterance_length_s,
        }
    }
}

/// Endpoint rules; any rule firing ends the utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub rules: Vec<EndpointRule>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                // Long silence with nothing said
                EndpointRule::new(false, 5.0, 0.0),
                // Pause after speech
                EndpointRule::new(true, 1.0, 0.0),
                // Maximum utterance length
                EndpointRule::new(false, 0.0, 20.0),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceWeightingConfig {
    /// Weight given to silence and low-confidence frames
    pub silence_weight: f32,
    /// Voiced frames whose best posterior is below this are re-weighted as silence
    pub min_confidence: f32,
}

impl Default for SilenceWeightingConfig {
    fn default() -> Self {
        Self {
            silence_weight: 0.001,
            min_confidence: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RescoringConfig {
    pub lm_weight: f32,
}

impl Default for RescoringConfig {
    fn default() -> Self {
        Self { lm_weight: 0.5 }
    }
}

impl ModelConfig {
    /// Load `conf/model.toml` below `dir`, falling back to defaults when absent
    pub fn load(dir: &Path) -> VRecogResult<Self> {
        let path = dir.join("conf").join("model.toml");

        if !path.exists() {
            tracing::debug!("No model config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml(&content)
            .map_err(|reason| VRecogError::model_load(&path, reason))?;

        tracing::info!(
            "Loaded model config: {:?} ({} endpoint rules)",
            path,
            config.endpoint.rules.len()
        );
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.features.frame_shift_ms == 0 {
            return Err("features.frame_shift_ms must be positive".into());
        }
        if self.features.frame_length_ms < self.features.frame_shift_ms {
            return Err("features.frame_length_ms must be >= frame_shift_ms".into());
        }
        if self.decoding.min_word_frames == 0 {
            return Err("decoding.min_word_frames must be positive".into());
        }
        if self.decoding.max_candidates == 0 {
            return Err("decoding.max_candidates must be positive".into());
        }
        for (i, rule) in self.endpoint.rules.iter().enumerate() {
            if rule.min_trailing_silence_s <= 0.0 && rule.min_utterance_length_s <= 0.0 {
                return Err(format!("endpoint rule {} would fire on every chunk", i + 1));
            }
        }
        if !(0.0..=1.0).contains(&self.silence_weighting.min_confidence) {
            return Err("silence_weighting.min_confidence must be within [0, 1]".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ModelConfig::from_toml("").unwrap();
        assert_eq!(config, ModelConfig::default());
        assert_eq!(config.endpoint.rules.len(), 3);
    }

    #[test]
    fn test_partial_override() {
        let config = ModelConfig::from_toml(
            r#"
[features]
silence_floor_db = -60.0

[[endpoint.rules]]
must_contain_nonsilence = true
min_trailing_silence_s = 0.3
"#,
        )
        .unwrap();

        assert_eq!(config.features.silence_floor_db, -60.0);
        assert_eq!(config.features.frame_shift_ms, 10);
        assert_eq!(config.endpoint.rules, vec![EndpointRule::new(true, 0.3, 0.0)]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ModelConfig::from_toml("[features]\nframe_shift_ms = 0").is_err());
        assert!(ModelConfig::from_toml("[decoding]\nmin_word_frames = 0").is_err());
        assert!(ModelConfig::from_toml("[features\n").is_err());
        assert!(ModelConfig::from_toml("[[endpoint.rules]]\nmust_contain_nonsilence = true").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = std::env::temp_dir().join("vrecog-config-test-missing");
        let config = ModelConfig::load(&dir).unwrap();
        assert_eq!(config, ModelConfig::default());
    }
}
