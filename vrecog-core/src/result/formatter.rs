//! Result formatter
//!
//! Deterministic mapping from finalized utterances to result strings.

use super::schema::{
    Alternative, AlternativesResult, ErrorResult, FinalResult, KwsResult, PartialResult, WordResult,
};
use super::{Utterance, WakeDetection};
use crate::error::VRecogError;
use crate::model::UNK_WORD;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultFormatter {
    max_alternatives: usize,
}

impl ResultFormatter {
    pub fn new(max_alternatives: usize) -> Self {
        Self { max_alternatives }
    }

    pub fn max_alternatives(&self) -> usize {
        self.max_alternatives
    }

    /// 0 selects the single best path
    pub fn set_max_alternatives(&mut self, max_alternatives: usize) {
        self.max_alternatives = max_alternatives;
    }

    /// Final or endpoint result; `None` means nothing was decoded
    pub fn final_result(&self, utterance: Option<&Utterance>) -> String {
        if self.max_alternatives > 0 {
            to_json(&self.alternatives(utterance))
        } else {
            to_json(&Self::single(utterance))
        }
    }

    pub fn partial_result(&self, text: &str) -> String {
        to_json(&PartialResult {
            partial: text.to_string(),
        })
    }

    pub fn kws_result(&self, detection: Option<&WakeDetection>) -> String {
        let result = match detection {
            Some(d) => KwsResult {
                conf: Some(round(d.confidence as f64, 6)),
                detected: true,
                end: Some(round(d.end, 3)),
                start: Some(round(d.start, 3)),
                text: d.phrase.clone(),
            },
            None => KwsResult {
                conf: None,
                detected: false,
                end: None,
                start: None,
                text: String::new(),
            },
        };
        to_json(&result)
    }

    pub fn error(&self, err: &VRecogError) -> String {
        to_json(&ErrorResult {
            code: err.ffi_code(),
            error: err.to_string(),
        })
    }

    fn single(utterance: Option<&Utterance>) -> FinalResult {
        let Some(utterance) = utterance else {
            return FinalResult::empty();
        };

        let words = normalize_spans(
            utterance
                .lattice
                .best_path()
                .iter()
                .map(|w| WordResult {
                    conf: round(w.confidence as f64, 6),
                    end: round(utterance.timing.seconds(w.end_frame), 3),
                    start: round(utterance.timing.seconds(w.start_frame), 3),
                    word: utterance.word(w.word).to_string(),
                })
                .collect(),
        );
        if words.is_empty() {
            return FinalResult::empty();
        }

        let text = words.iter().map(|w| w.word.as_str()).collect::<Vec<_>>().join(" ");
        let (spk, spk_frames) = match &utterance.speaker {
            Some(embedding) => (
                embedding.vector().map(<[f32]>::to_vec),
                Some(embedding.frames()),
            ),
            None => (None, None),
        };

        FinalResult {
            result: words,
            spk,
            spk_frames,
            text,
        }
    }

    fn alternatives(&self, utterance: Option<&Utterance>) -> AlternativesResult {
        let alternatives = match utterance {
            Some(utterance) => utterance
                .lattice
                .nbest(self.max_alternatives)
                .into_iter()
                .map(|hyp| Alternative {
                    confidence: round(hyp.confidence as f64, 6),
                    text: hyp
                        .words
                        .iter()
                        .map(|&id| utterance.word(id))
                        .collect::<Vec<_>>()
                        .join(" "),
                })
                .collect(),
            None => vec![Alternative {
                confidence: 1.0,
                text: String::new(),
            }],
        };
        AlternativesResult { alternatives }
    }
}

impl FinalResult {
    fn empty() -> Self {
        Self {
            result: Vec::new(),
            spk: None,
            spk_frames: None,
            text: String::new(),
        }
    }
}

impl Utterance {
    fn word(&self, id: crate::model::WordId) -> &str {
        self.symbols.word(id).unwrap_or(UNK_WORD)
    }
}

/// Time-ordered, non-overlapping spans
fn normalize_spans(mut words: Vec<WordResult>) -> Vec<WordResult> {
    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    let mut previous_end = f64::NEG_INFINITY;
    for word in &mut words {
        if word.start < previous_end {
            word.start = previous_end;
        }
        if word.end < word.start {
            word.end = word.start;
        }
        previous_end = word.end;
    }
    words
}

fn round(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!("Result serialization failed: {}", e);
        String::from(r#"{"text": ""}"#)
    })
}
