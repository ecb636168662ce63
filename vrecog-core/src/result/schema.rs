//! Wire schema of result strings

use serde::{Deserialize, Serialize};

/// One word span; keys serialise in alphabetical order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordResult {
    pub conf: f64,
    pub end: f64,
    pub start: f64,
    pub word: String,
}

/// Single-hypothesis final result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result: Vec<WordResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spk: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spk_frames: Option<usize>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub confidence: f64,
    pub text: String,
}

/// N-best final result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativesResult {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub partial: String,
}

/// Wake-word detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KwsResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<f64>,
    pub detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    pub text: String,
}

/// Returned instead of a result when a call fails
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub code: i32,
    pub error: String,
}
