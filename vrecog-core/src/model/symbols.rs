//! Word symbol table (`words.txt`)

use crate::error::{VRecogError, VRecogResult};
use std::collections::HashMap;
use std::path::Path;

/// Word symbol id as stored in the symbol table
pub type WordId = i32;

/// Reserved id of `<eps>`
pub const EPSILON_ID: WordId = 0;

/// Sentinel returned across the C ABI for unknown words
pub const WORD_NOT_FOUND: WordId = -1;

/// Out-of-grammar catch-all word
pub const UNK_WORD: &str = "[unk]";

const EPSILON_WORD: &str = "<eps>";

/// Bidirectional word and id mapping
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    ids: HashMap<String, WordId>,
    words: HashMap<WordId, String>,
}

impl SymbolTable {
    /// Parse the `<word> <id>` text format
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut table = Self::default();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (word, id) = match (parts.next(), parts.next(), parts.next()) {
                (Some(word), Some(id), None) => (word, id),
                _ => return Err(format!("malformed entry at line {}: '{}'", line_num + 1, line)),
            };

            let id: WordId = id
                .parse()
                .map_err(|_| format!("invalid id at line {}: '{}'", line_num + 1, id))?;
            if id < 0 {
                return Err(format!("negative id at line {}: {}", line_num + 1, id));
            }
            if table.words.contains_key(&id) || table.ids.contains_key(word) {
                return Err(format!("duplicate entry at line {}: '{}'", line_num + 1, line));
            }

            table.ids.insert(word.to_string(), id);
            table.words.insert(id, word.to_string());
        }

        if table.ids.get(EPSILON_WORD) != Some(&EPSILON_ID) {
            return Err(format!("'{} {}' entry missing", EPSILON_WORD, EPSILON_ID));
        }

        Ok(table)
    }

    pub fn load(path: &Path) -> VRecogResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VRecogError::model_load(path, e.to_string()))?;
        Self::parse(&content).map_err(|reason| VRecogError::model_load(path, reason))
    }

    /// Id of `word`, if present
    pub fn find(&self, word: &str) -> Option<WordId> {
        self.ids.get(word).copied()
    }

    /// Like [`find`](Self::find), reporting a miss as [`VRecogError::LookupMiss`]
    pub fn lookup(&self, word: &str) -> VRecogResult<WordId> {
        self.find(word)
            .ok_or_else(|| VRecogError::LookupMiss(word.to_string()))
    }

    pub fn word(&self, id: WordId) -> Option<&str> {
        self.words.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: &str = "<eps> 0\n[unk] 1\nyes 2\nno 3\n";

    #[test]
    fn test_parse_and_lookup() {
        let table = SymbolTable::parse(WORDS).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.find("<eps>"), Some(EPSILON_ID));
        assert_eq!(table.find("yes"), Some(2));
        assert_eq!(table.word(3), Some("no"));
        assert_eq!(table.find("maybe"), None);
        assert!(matches!(table.lookup("maybe"), Err(VRecogError::LookupMiss(w)) if w == "maybe"));
    }

    #[test]
    fn test_epsilon_required() {
        assert!(SymbolTable::parse("yes 1\n").is_err());
        assert!(SymbolTable::parse("<eps> 4\n").is_err());
    }

    #[test]
    fn test_malformed_entries() {
        assert!(SymbolTable::parse("<eps> 0\nyes\n").is_err());
        assert!(SymbolTable::parse("<eps> 0\nyes two\n").is_err());
        assert!(SymbolTable::parse("<eps> 0\nyes 1\nno 1\n").is_err());
        assert!(SymbolTable::parse("<eps> 0\nyes -3\n").is_err());
    }
}
