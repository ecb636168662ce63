//! Unigram rescoring LM (`rescore/lm.txt`)

use crate::error::{VRecogError, VRecogResult};
use crate::model::symbols::{SymbolTable, WordId};
use std::collections::HashMap;
use std::path::Path;

/// log10 probability assigned to words the LM does not list
const DEFAULT_FLOOR_LOGPROB: f32 = -7.0;

#[derive(Debug, Clone)]
pub struct RescoringLm {
    logprobs: HashMap<WordId, f32>,
    floor: f32,
}

impl RescoringLm {
    pub fn load(path: &Path, symbols: &SymbolTable) -> VRecogResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VRecogError::model_load(path, e.to_string()))?;
        Self::parse(&content, symbols).map_err(|reason| VRecogError::model_load(path, reason))
    }

    /// `<word> <log10 prob>` per line. Words outside the symbol table are
    /// skipped, they can never be decoded anyway.
    pub fn parse(content: &str, symbols: &SymbolTable) -> Result<Self, String> {
        let mut logprobs = HashMap::new();
        let mut skipped = 0usize;

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (word, value) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("malformed entry at line {}: '{}'", line_num + 1, line))?;
            let logprob: f32 = value
                .trim()
                .parse()
                .map_err(|_| format!("invalid log-probability at line {}: '{}'", line_num + 1, value))?;
            if !logprob.is_finite() || logprob > 0.0 {
                return Err(format!("log-probability out of range at line {}: {}", line_num + 1, logprob));
            }

            match symbols.find(word) {
                Some(id) => {
                    logprobs.insert(id, logprob);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::debug!("Rescoring LM: skipped {} words outside the symbol table", skipped);
        }

        let floor = logprobs
            .values()
            .copied()
            .fold(DEFAULT_FLOOR_LOGPROB, f32::min);

        Ok(Self { logprobs, floor })
    }

    pub fn logprob(&self, word: WordId) -> f32 {
        self.logprobs.get(&word).copied().unwrap_or(self.floor)
    }

    pub fn len(&self) -> usize {
        self.logprobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logprobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lm() {
        let symbols = SymbolTable::parse("<eps> 0\nyes 1\nno 2\n").unwrap();
        let lm = RescoringLm::parse("yes -0.5\nno -2.0\nmaybe -1.0\n", &symbols).unwrap();

        assert_eq!(lm.len(), 2);
        assert_eq!(lm.logprob(1), -0.5);
        assert_eq!(lm.logprob(2), -2.0);
        assert_eq!(lm.logprob(99), DEFAULT_FLOOR_LOGPROB);
    }

    #[test]
    fn test_rejects_positive_logprob() {
        let symbols = SymbolTable::parse("<eps> 0\nyes 1\n").unwrap();
        assert!(RescoringLm::parse("yes 0.5\n", &symbols).is_err());
        assert!(RescoringLm::parse("yes\n", &symbols).is_err());
    }
}
