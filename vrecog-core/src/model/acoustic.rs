//! Acoustic unit inventory (`am/units.toml`)
//!
//! Each unit is one spectral band of the filterbank front-end; the unit's
//! word is what the decoder emits when the band dominates a run of frames.

use crate::error::{VRecogError, VRecogResult};
use crate::model::symbols::{SymbolTable, WordId};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct UnitsFile {
    #[serde(default)]
    units: Vec<UnitEntry>,
}

#[derive(Debug, Deserialize)]
struct UnitEntry {
    word: String,
    freq_hz: f32,
}

/// One acoustic unit bound to its output word
#[derive(Debug, Clone, PartialEq)]
pub struct AcousticUnit {
    pub word: String,
    pub word_id: WordId,
    pub freq_hz: f32,
}

#[derive(Debug, Clone)]
pub struct AcousticModel {
    units: Vec<AcousticUnit>,
}

impl AcousticModel {
    pub fn load(path: &Path, symbols: &SymbolTable) -> VRecogResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VRecogError::model_load(path, e.to_string()))?;
        Self::parse(&content, symbols).map_err(|reason| VRecogError::model_load(path, reason))
    }

    pub fn parse(content: &str, symbols: &SymbolTable) -> Result<Self, String> {
        let file: UnitsFile = toml::from_str(content).map_err(|e| e.to_string())?;

        if file.units.is_empty() {
            return Err("no acoustic units defined".into());
        }

        let mut seen = HashSet::new();
        let mut units = Vec::with_capacity(file.units.len());

        for entry in file.units {
            if !(entry.freq_hz.is_finite() && entry.freq_hz > 0.0) {
                return Err(format!("unit '{}' has invalid frequency {}", entry.word, entry.freq_hz));
            }
            if !seen.insert(entry.word.clone()) {
                return Err(format!("duplicate unit '{}'", entry.word));
            }
            let word_id = symbols
                .find(&entry.word)
                .ok_or_else(|| format!("unit word '{}' missing from symbol table", entry.word))?;

            units.push(AcousticUnit {
                word: entry.word,
                word_id,
                freq_hz: entry.freq_hz,
            });
        }

        Ok(Self { units })
    }

    pub fn units(&self) -> &[AcousticUnit] {
        &self.units
    }

    /// Filterbank centre frequencies, in unit order
    pub fn band_centers(&self) -> Vec<f32> {
        self.units.iter().map(|u| u.freq_hz).collect()
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> SymbolTable {
        SymbolTable::parse("<eps> 0\nyes 1\nno 2\n").unwrap()
    }

    #[test]
    fn test_parse_units() {
        let am = AcousticModel::parse(
            r#"
[[units]]
word = "yes"
freq_hz = 600.0

[[units]]
word = "no"
freq_hz = 900.0
"#,
            &symbols(),
        )
        .unwrap();

        assert_eq!(am.num_units(), 2);
        assert_eq!(am.band_centers(), vec![600.0, 900.0]);
        assert_eq!(am.units()[1].word_id, 2);
    }

    #[test]
    fn test_rejects_bad_units() {
        let syms = symbols();
        assert!(AcousticModel::parse("", &syms).is_err());
        assert!(AcousticModel::parse("[[units]]\nword = \"maybe\"\nfreq_hz = 500.0", &syms).is_err());
        assert!(AcousticModel::parse("[[units]]\nword = \"yes\"\nfreq_hz = -1.0", &syms).is_err());
        assert!(AcousticModel::parse(
            "[[units]]\nword = \"yes\"\nfreq_hz = 500.0\n[[units]]\nword = \"yes\"\nfreq_hz = 700.0",
            &syms
        )
        .is_err());
    }
}
