//! Speaker embedding model
//!
//! Resources: `mean.vec` (global feature mean), `transform.mat` (projection,
//! one row per output dimension) and an optional `spk.toml`. The embedding of
//! an utterance is the L2-normalised projection of its pooled band statistics
//! (mean and standard deviation per band over speech frames).

use crate::audio::FeatureFrame;
use crate::error::{VRecogError, VRecogResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bands of the speaker filterbank
pub const SPEAKER_BANDS: usize = 16;

const LOWEST_BAND_HZ: f32 = 100.0;
const HIGHEST_BAND_HZ: f32 = 3800.0;

/// Frames weighted below this are not speech
const SPEECH_WEIGHT: f32 = 0.1;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SpeakerSettings {
    min_frames: usize,
}

impl Default for SpeakerSettings {
    fn default() -> Self {
        Self { min_frames: 50 }
    }
}

/// Result of reducing one utterance to an embedding
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakerEmbedding {
    Vector { vector: Vec<f32>, frames: usize },
    /// Fewer speech frames than the model needs
    Insufficient { frames: usize },
}

impl SpeakerEmbedding {
    pub fn frames(&self) -> usize {
        match self {
            Self::Vector { frames, .. } | Self::Insufficient { frames } => *frames,
        }
    }

    pub fn vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector { vector, .. } => Some(vector),
            Self::Insufficient { .. } => None,
        }
    }
}

#[derive(Debug)]
struct SpeakerResources {
    path: PathBuf,
    mean: Vec<f32>,
    transform: Vec<Vec<f32>>,
    min_frames: usize,
}

impl Drop for SpeakerResources {
    fn drop(&mut self) {
        tracing::debug!("Speaker model released: {:?}", self.path);
    }
}

/// Shared handle; clones share one set of resources
#[derive(Debug, Clone)]
pub struct SpeakerModel {
    inner: Arc<SpeakerResources>,
}

impl SpeakerModel {
    pub fn load(path: impl AsRef<Path>) -> VRecogResult<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(VRecogError::model_load(path, "speaker model directory not found"));
        }

        let mean_path = path.join("mean.vec");
        let mean = parse_row(&read(&mean_path)?)
            .map_err(|reason| VRecogError::model_load(&mean_path, reason))?;
        if mean.len() != SPEAKER_BANDS * 2 {
            return Err(VRecogError::model_load(
                &mean_path,
                format!("expected {} values, found {}", SPEAKER_BANDS * 2, mean.len()),
            ));
        }

        let transform_path = path.join("transform.mat");
        let transform = parse_matrix(&read(&transform_path)?, mean.len())
            .map_err(|reason| VRecogError::model_load(&transform_path, reason))?;

        let settings_path = path.join("spk.toml");
        let settings: SpeakerSettings = if settings_path.exists() {
            toml::from_str(&read(&settings_path)?)
                .map_err(|e| VRecogError::model_load(&settings_path, e.to_string()))?
        } else {
            SpeakerSettings::default()
        };

        tracing::info!(
            "Speaker model loaded: {:?} (dim={}, min_frames={})",
            path,
            transform.len(),
            settings.min_frames
        );

        Ok(Self {
            inner: Arc::new(SpeakerResources {
                path: path.to_path_buf(),
                mean,
                transform,
                min_frames: settings.min_frames,
            }),
        })
    }

    /// Take another reference
    pub fn acquire(&self) -> Self {
        self.clone()
    }

    /// Drop this reference; resources go away with the last one
    pub fn release(self) {
        drop(self);
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Embedding dimension
    pub fn dim(&self) -> usize {
        self.inner.transform.len()
    }

    pub fn min_frames(&self) -> usize {
        self.inner.min_frames
    }

    /// Filterbank centres for speaker features, log-spaced
    pub fn band_centers() -> Vec<f32> {
        let ratio = (HIGHEST_BAND_HZ / LOWEST_BAND_HZ).powf(1.0 / (SPEAKER_BANDS - 1) as f32);
        (0..SPEAKER_BANDS)
            .map(|i| LOWEST_BAND_HZ * ratio.powi(i as i32))
            .collect()
    }

    /// Reduce one utterance's speaker frames to an embedding. `weights` are
    /// the decoder's per-frame silence weights.
    pub fn extract(&self, frames: &[FeatureFrame], weights: &[f32]) -> SpeakerEmbedding {
        let speech: Vec<(&FeatureFrame, f32)> = frames
            .iter()
            .zip(weights)
            .filter(|&(_, &w)| w >= SPEECH_WEIGHT)
            .map(|(f, &w)| (f, w))
            .collect();

        let count = speech.len();
        if count < self.inner.min_frames || count == 0 {
            return SpeakerEmbedding::Insufficient { frames: count };
        }

        let total_weight: f32 = speech.iter().map(|(_, w)| w).sum();
        let mut mean = [0.0f32; SPEAKER_BANDS];
        for (frame, w) in &speech {
            for (acc, &band) in mean.iter_mut().zip(&frame.bands_db) {
                *acc += w * band;
            }
        }
        mean.iter_mut().for_each(|m| *m /= total_weight);

        let mut var = [0.0f32; SPEAKER_BANDS];
        for (frame, w) in &speech {
            for ((acc, &band), m) in var.iter_mut().zip(&frame.bands_db).zip(&mean) {
                *acc += w * (band - m).powi(2);
            }
        }

        let stats: Vec<f32> = mean
            .iter()
            .copied()
            .chain(var.iter().map(|v| (v / total_weight).sqrt()))
            .zip(&self.inner.mean)
            .map(|(s, m)| s - m)
            .collect();

        let mut vector: Vec<f32> = self
            .inner
            .transform
            .iter()
            .map(|row| row.iter().zip(&stats).map(|(a, b)| a * b).sum())
            .collect();

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            vector.iter_mut().for_each(|v| *v /= norm);
        }

        SpeakerEmbedding::Vector { vector, frames: count }
    }
}

fn read(path: &Path) -> VRecogResult<String> {
    std::fs::read_to_string(path).map_err(|e| VRecogError::model_load(path, e.to_string()))
}

fn parse_row(content: &str) -> Result<Vec<f32>, String> {
    content
        .split_whitespace()
        .filter(|t| !matches!(*t, "[" | "]"))
        .map(|t| {
            t.parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("invalid value '{}'", t))
        })
        .collect()
}

fn parse_matrix(content: &str, cols: usize) -> Result<Vec<Vec<f32>>, String> {
    let mut rows = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let row = parse_row(line)?;
        if row.is_empty() {
            continue;
        }
        if row.len() != cols {
            return Err(format!(
                "row {} has {} columns, expected {}",
                line_num + 1,
                row.len(),
                cols
            ));
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err("empty transform".into());
    }
    Ok(rows)
}
