//! Runtime grammars
//!
//! A grammar is a JSON array of phrases, e.g. `["hello system", "[unk]"]`.
//! The reserved `[unk]` entry lets out-of-grammar speech decode as `[unk]`
//! instead of being forced onto the closest phrase. A grammar is compiled
//! once per session into a restricted search graph over a composable
//! lexicon.

mod matcher;

pub use matcher::PhraseMatch;

use crate::error::{VRecogError, VRecogResult};
use crate::model::{GraphKind, SearchGraph, SymbolTable, WordId, UNK_WORD};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Parsed, not yet compiled, phrase list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    phrases: Vec<String>,
    has_unk: bool,
}

impl Grammar {
    /// Parse a JSON array of phrase strings
    pub fn parse(json: &str) -> VRecogResult<Self> {
        let entries: Vec<String> = serde_json::from_str(json)
            .map_err(|e| VRecogError::Grammar(format!("expected a JSON array of strings: {}", e)))?;
        Ok(Self::from_phrases(entries))
    }

    /// Normalises whitespace and drops empty and duplicate phrases
    pub fn from_phrases<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grammar = Self::default();
        for entry in entries {
            let phrase = entry.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
            if phrase.is_empty() {
                continue;
            }
            if phrase == UNK_WORD {
                grammar.has_unk = true;
            } else if !grammar.phrases.contains(&phrase) {
                grammar.phrases.push(phrase);
            }
        }
        grammar
    }

    /// Phrases, without the `[unk]` entry
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn has_unk(&self) -> bool {
        self.has_unk
    }

    /// No phrases and no `[unk]`
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty() && !self.has_unk
    }

    /// Compile against a composable lexicon.
    ///
    /// Words the lexicon cannot spell are skipped with a warning; a phrase
    /// that loses all its words is dropped. Fails if nothing usable is left.
    pub fn compile(
        &self,
        lexicon: &BTreeSet<WordId>,
        symbols: &Arc<SymbolTable>,
    ) -> VRecogResult<CompiledGrammar> {
        let mut phrases = Vec::new();
        let mut vocabulary = BTreeSet::new();

        for text in &self.phrases {
            let mut words = Vec::new();
            for token in text.split_whitespace() {
                match symbols.lookup(token) {
                    Ok(id) if lexicon.contains(&id) => words.push(id),
                    Ok(_) => tracing::warn!("Grammar word '{}' not in lexicon, skipped", token),
                    Err(e) => tracing::warn!("{}, skipped in phrase '{}'", e, text),
                }
            }
            if words.is_empty() {
                tracing::warn!("Grammar phrase '{}' has no known words, dropped", text);
                continue;
            }
            vocabulary.extend(words.iter().copied());
            phrases.push(CompiledPhrase {
                text: words
                    .iter()
                    .filter_map(|&id| symbols.word(id))
                    .collect::<Vec<_>>()
                    .join(" "),
                words,
            });
        }

        let unk = if self.has_unk {
            let id = symbols.find(UNK_WORD).filter(|id| lexicon.contains(id));
            if id.is_none() {
                tracing::warn!("Grammar requests {} but the lexicon has no such word", UNK_WORD);
            }
            id
        } else {
            None
        };

        if phrases.is_empty() {
            return Err(VRecogError::Grammar("grammar has no usable phrase".into()));
        }
        if let Some(id) = unk {
            vocabulary.insert(id);
        }

        tracing::debug!(
            "Compiled grammar: {} phrases, {} words, unk={}",
            phrases.len(),
            vocabulary.len(),
            unk.is_some()
        );

        Ok(CompiledGrammar {
            graph: Arc::new(SearchGraph::new(GraphKind::Lookahead, vocabulary, unk)),
            phrases,
            symbols: Arc::clone(symbols),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledPhrase {
    text: String,
    words: Vec<WordId>,
}

/// Grammar bound to one session
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    graph: Arc<SearchGraph>,
    phrases: Vec<CompiledPhrase>,
    symbols: Arc<SymbolTable>,
}

impl CompiledGrammar {
    pub fn graph(&self) -> &Arc<SearchGraph> {
        &self.graph
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(|p| p.text.as_str())
    }

    /// Whether every word of `text` is in the compiled vocabulary
    pub fn contains(&self, text: &str) -> bool {
        let mut tokens = text.split_whitespace().peekable();
        if tokens.peek().is_none() {
            return false;
        }
        tokens.all(|token| {
            self.symbols
                .find(token)
                .is_some_and(|id| self.graph.contains(id))
        })
    }
}
