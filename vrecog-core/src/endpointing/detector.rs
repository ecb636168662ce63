//! Endpoint detector
//!
//! Evaluates endpoint rules on accepted audio time, never wall-clock time, so
//! a stream fed faster or slower than real time endpoints identically.
//! Trailing silence runs from the start of the last speech frame's hop to
//! the end of the audio accepted so far, including samples still waiting
//! for a full analysis window.

use crate::config::{EndpointConfig, EndpointRule};
use crate::decoder::DecoderEngine;

/// Absorbs float error in frames times shift
const TIME_EPS: f32 = 1e-4;

/// Endpoint detection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDetectorConfig {
    pub rules: Vec<EndpointRule>,
    /// Duration of one decoded frame (seconds)
    pub frame_shift_s: f32,
}

impl EndpointDetectorConfig {
    pub fn new(config: &EndpointConfig, frame_shift_s: f32) -> Self {
        Self {
            rules: config.rules.clone(),
            frame_shift_s,
        }
    }
}

impl Default for EndpointDetectorConfig {
    fn default() -> Self {
        Self::new(&EndpointConfig::default(), 0.01)
    }
}

/// Endpoint decision for the audio decoded so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointResult {
    /// Keep listening
    Continue,
    /// A trailing-silence rule fired
    Detected { rule: usize },
    /// Maximum utterance length reached
    ForcedSegmentation { rule: usize },
    /// Requested by the caller
    External,
}

impl EndpointResult {
    pub fn is_endpoint(self) -> bool {
        self != Self::Continue
    }
}

/// Decoder progress the rules look at
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecodeProgress {
    pub frames_decoded: usize,
    pub trailing_silence_frames: usize,
    pub contains_nonsilence: bool,
    /// Audio accepted for the utterance (seconds)
    pub audio_s: f32,
}

impl DecodeProgress {
    pub fn of(decoder: &dyn DecoderEngine, audio_s: f32) -> Self {
        Self {
            frames_decoded: decoder.num_frames_decoded(),
            trailing_silence_frames: decoder.trailing_silence_frames(),
            contains_nonsilence: decoder.contains_nonsilence(),
            audio_s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EndpointDetector {
    config: EndpointDetectorConfig,
}

impl EndpointDetector {
    pub fn new(config: EndpointDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EndpointDetectorConfig {
        &self.config
    }

    /// First rule that fires, in configuration order
    pub fn evaluate(&self, progress: &DecodeProgress, external: bool) -> EndpointResult {
        if external {
            tracing::debug!("Endpoint: requested by caller");
            return EndpointResult::External;
        }
        if progress.frames_decoded == 0 {
            return EndpointResult::Continue;
        }

        let shift = self.config.frame_shift_s;
        let utterance_s = progress.audio_s.max(progress.frames_decoded as f32 * shift);
        let speech_frames = progress
            .frames_decoded
            .saturating_sub(progress.trailing_silence_frames);
        let trailing_s = utterance_s - speech_frames.saturating_sub(1) as f32 * shift;

        for (index, rule) in self.config.rules.iter().enumerate() {
            if rule.must_contain_nonsilence && !progress.contains_nonsilence {
                continue;
            }
            if trailing_s + TIME_EPS < rule.min_trailing_silence_s
                || utterance_s + TIME_EPS < rule.min_utterance_length_s
            {
                continue;
            }

            let rule_no = index + 1;
            return if rule.min_trailing_silence_s > 0.0 {
                tracing::debug!(
                    "Endpoint: rule{} fired (trailing silence {:.2}s, utterance {:.2}s)",
                    rule_no,
                    trailing_s,
                    utterance_s
                );
                EndpointResult::Detected { rule: rule_no }
            } else {
                tracing::info!("Endpoint: maximum utterance length reached ({:.2}s)", utterance_s);
                EndpointResult::ForcedSegmentation { rule: rule_no }
            };
        }

        EndpointResult::Continue
    }
}
