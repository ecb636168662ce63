//! Wake phrase matching over decoded words

use super::CompiledGrammar;
use crate::decoder::HypWord;

/// A grammar phrase found in a word sequence
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    pub phrase: String,
    pub start_frame: usize,
    /// Exclusive
    pub end_frame: usize,
    /// Mean word confidence
    pub confidence: f32,
}

impl CompiledGrammar {
    /// Earliest-ending contiguous occurrence of any phrase in `words`.
    /// `[unk]` never matches.
    pub fn find_phrase(&self, words: &[HypWord]) -> Option<PhraseMatch> {
        for end in 0..words.len() {
            for phrase in &self.phrases {
                let len = phrase.words.len();
                if len == 0 || len > end + 1 {
                    continue;
                }
                let span = &words[end + 1 - len..=end];
                let matched = span
                    .iter()
                    .zip(&phrase.words)
                    .all(|(hyp, &id)| hyp.word == id);
                if matched {
                    return Some(PhraseMatch {
                        phrase: phrase.text.clone(),
                        start_frame: span[0].start_frame,
                        end_frame: span[len - 1].end_frame,
                        confidence: span.iter().map(|w| w.confidence).sum::<f32>() / len as f32,
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::decoder::HypWord;
    use crate::grammar::Grammar;
    use crate::model::{SymbolTable, WordId};
    use std::sync::Arc;

    fn word(id: WordId, start: usize, conf: f32) -> HypWord {
        HypWord {
            word: id,
            start_frame: start,
            end_frame: start + 20,
            confidence: conf,
        }
    }

    fn grammar() -> crate::grammar::CompiledGrammar {
        let symbols = Arc::new(
            SymbolTable::parse("<eps> 0\n[unk] 1\nhello 2\nsystem 3\nstop 4\n").unwrap(),
        );
        Grammar::parse(r#"["hello system", "stop", "[unk]"]"#)
            .unwrap()
            .compile(&[1, 2, 3, 4].into_iter().collect(), &symbols)
            .unwrap()
    }

    #[test]
    fn test_two_word_phrase() {
        let words = [word(1, 0, 0.5), word(2, 30, 0.9), word(3, 60, 0.7)];
        let found = grammar().find_phrase(&words).unwrap();

        assert_eq!(found.phrase, "hello system");
        assert_eq!(found.start_frame, 30);
        assert_eq!(found.end_frame, 80);
        assert!((found.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_partial_phrase_does_not_match() {
        let words = [word(2, 0, 0.9), word(1, 30, 0.9), word(3, 60, 0.9)];
        assert!(grammar().find_phrase(&words).is_none());
    }

    #[test]
    fn test_earliest_ending_wins() {
        let words = [word(4, 0, 0.9), word(2, 30, 0.9), word(3, 60, 0.9)];
        assert_eq!(grammar().find_phrase(&words).unwrap().phrase, "stop");
    }

    #[test]
    fn test_unk_never_matches() {
        assert!(grammar().find_phrase(&[word(1, 0, 1.0)]).is_none());
        assert!(grammar().find_phrase(&[]).is_none());
    }
}
