//! Feature pipeline
//!
//! Frames the canonical waveform (Hann window, fixed shift) and computes per
//! frame the log energy plus band powers at a fixed set of centre
//! frequencies (Goertzel). One pipeline instance per track; it buffers only
//! the samples needed to complete the next window.

use crate::config::FeatureConfig;

/// Floor added before taking logs
const POWER_EPS: f32 = 1e-12;

/// Reported for bands at or above Nyquist
const OUT_OF_BAND_DB: f32 = -120.0;

/// One analysis frame
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    /// Mean-square energy in dBFS
    pub log_energy_db: f32,
    /// Band power in dB, one entry per centre frequency
    pub bands_db: Vec<f32>,
}

/// Converts audio samples into frames as they become available
pub trait FeaturePipeline: Send {
    /// Append canonical samples
    fn accept_waveform(&mut self, samples: &[f32]);

    /// No more input; flushes a partial trailing window
    fn input_finished(&mut self);

    fn is_finished(&self) -> bool;

    fn num_frames_ready(&self) -> usize;

    fn frame(&self, index: usize) -> Option<&FeatureFrame>;

    fn frames(&self) -> &[FeatureFrame];

    fn frame_shift_samples(&self) -> usize;

    fn frame_length_samples(&self) -> usize;
}

/// Hann-windowed Goertzel filterbank
#[derive(Debug, Clone)]
pub struct FilterbankPipeline {
    shift: usize,
    window: Vec<f32>,
    /// Coefficient `2 cos(w)` per band, `None` above Nyquist
    coeffs: Vec<Option<f32>>,
    /// Normalises a full-scale sine to 0 dB band power
    band_norm: f32,
    pending: Vec<f32>,
    frames: Vec<FeatureFrame>,
    finished: bool,
}

impl FilterbankPipeline {
    pub fn new(sample_rate: f32, config: &FeatureConfig, centers: &[f32]) -> Self {
        let shift = ms_to_samples(sample_rate, config.frame_shift_ms).max(1);
        let length = ms_to_samples(sample_rate, config.frame_length_ms).max(shift);

        let window: Vec<f32> = (0..length)
            .map(|n| {
                0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / (length as f32 - 1.0).max(1.0)).cos()
            })
            .collect();
        let window_sum: f32 = window.iter().sum();

        let nyquist = sample_rate / 2.0;
        let coeffs = centers
            .iter()
            .map(|&f| {
                (f < nyquist).then(|| 2.0 * (2.0 * std::f32::consts::PI * f / sample_rate).cos())
            })
            .collect();

        Self {
            shift,
            window,
            coeffs,
            band_norm: (window_sum / 2.0).powi(2).max(POWER_EPS),
            pending: Vec::with_capacity(length * 2),
            frames: Vec::new(),
            finished: false,
        }
    }

    fn compute_frame(&self, samples: &[f32]) -> FeatureFrame {
        let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;

        let bands_db = self
            .coeffs
            .iter()
            .map(|coeff| match coeff {
                Some(coeff) => {
                    let (mut s1, mut s2) = (0.0f32, 0.0f32);
                    for (x, w) in samples.iter().zip(&self.window) {
                        let s0 = x * w + coeff * s1 - s2;
                        s2 = s1;
                        s1 = s0;
                    }
                    let power = (s1 * s1 + s2 * s2 - coeff * s1 * s2).max(0.0);
                    10.0 * (power / self.band_norm + POWER_EPS).log10()
                }
                None => OUT_OF_BAND_DB,
            })
            .collect();

        FeatureFrame {
            log_energy_db: 10.0 * (energy + POWER_EPS).log10(),
            bands_db,
        }
    }

    fn drain_frames(&mut self) {
        let length = self.window.len();
        let mut offset = 0;
        while self.pending.len() - offset >= length {
            let frame = self.compute_frame(&self.pending[offset..offset + length]);
            self.frames.push(frame);
            offset += self.shift;
        }
        self.pending.drain(..offset.min(self.pending.len()));
    }
}

impl FeaturePipeline for FilterbankPipeline {
    fn accept_waveform(&mut self, samples: &[f32]) {
        if self.finished {
            tracing::warn!("Feature pipeline received audio after input_finished, ignoring");
            return;
        }
        self.pending.extend_from_slice(samples);
        self.drain_frames();
    }

    fn input_finished(&mut self) {
        if self.finished {
            return;
        }
        // Zero-pad a trailing partial window worth at least one shift
        if self.pending.len() >= self.shift {
            self.pending.resize(self.window.len(), 0.0);
            self.drain_frames();
        }
        self.pending.clear();
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn num_frames_ready(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Option<&FeatureFrame> {
        self.frames.get(index)
    }

    fn frames(&self) -> &[FeatureFrame] {
        &self.frames
    }

    fn frame_shift_samples(&self) -> usize {
        self.shift
    }

    fn frame_length_samples(&self) -> usize {
        self.window.len()
    }
}

fn ms_to_samples(sample_rate: f32, ms: u32) -> usize {
    (sample_rate * ms as f32 / 1000.0).round() as usize
}
