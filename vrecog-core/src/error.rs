use thiserror::Error;

#[derive(Error, Debug)]
pub enum VRecogError {
    // Model errors
    #[error("Model load failed: {path} - {reason}")]
    ModelLoad { path: String, reason: String },

    #[error("Unsupported graph type: {0}")]
    UnsupportedGraphType(String),

    #[error("Word not found in vocabulary: {0}")]
    LookupMiss(String),

    // Session errors
    #[error("Session is finalized and accepts no further calls")]
    SessionClosed,

    #[error("Invalid audio format: {0}")]
    InvalidAudioFormat(String),

    #[error("Invalid state transition: {track} {from} + {event}")]
    InvalidTransition {
        track: String,
        from: String,
        event: String,
    },

    // Grammar / config errors
    #[error("Grammar error: {0}")]
    Grammar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VRecogError {
    pub(crate) fn model_load(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }

    /// Stable integer code reported across the C ABI.
    pub fn ffi_code(&self) -> i32 {
        match self {
            Self::ModelLoad { .. } => -1,
            Self::UnsupportedGraphType(_) => -2,
            Self::SessionClosed => -3,
            Self::InvalidAudioFormat(_) => -4,
            Self::LookupMiss(_) => -5,
            Self::Grammar(_) => -6,
            Self::InvalidConfig(_) => -7,
            Self::InvalidTransition { .. } => -8,
            Self::Io(_) => -9,
        }
    }
}

pub type VRecogResult<T> = Result<T, VRecogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_codes_are_distinct() {
        let errors = [
            VRecogError::model_load("/m", "missing"),
            VRecogError::UnsupportedGraphType("HCLG".into()),
            VRecogError::SessionClosed,
            VRecogError::InvalidAudioFormat("odd".into()),
            VRecogError::LookupMiss("foo".into()),
            VRecogError::Grammar("empty".into()),
            VRecogError::InvalidConfig("bad".into()),
            VRecogError::InvalidTransition {
                track: "asr".into(),
                from: "Finalized".into(),
                event: "Audio".into(),
            },
            VRecogError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x")),
        ];

        let mut codes: Vec<i32> = errors.iter().map(|e| e.ffi_code()).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_model_load_message() {
        let err = VRecogError::model_load("/models/en", "graph/words.txt not found");
        assert_eq!(
            err.to_string(),
            "Model load failed: /models/en - graph/words.txt not found"
        );
    }
}
