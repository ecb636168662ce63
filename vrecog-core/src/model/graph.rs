//! Search graphs
//!
//! A precompiled graph (`HCLG.fst`) fixes the vocabulary at build time.
//! A composable graph (`HCLr.fst` + `Gr.fst`) keeps the lexicon separate so
//! a grammar can be composed onto it when a session is created.

use crate::error::{VRecogError, VRecogResult};
use crate::model::symbols::{SymbolTable, WordId, UNK_WORD};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Monolithic, cannot be recomposed
    Precompiled,
    /// Lexicon composed with a grammar on demand
    Lookahead,
}

/// Word-level search constraint used by the decoder
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGraph {
    kind: GraphKind,
    vocabulary: BTreeSet<WordId>,
    unk: Option<WordId>,
}

impl SearchGraph {
    pub fn new(kind: GraphKind, vocabulary: BTreeSet<WordId>, unk: Option<WordId>) -> Self {
        Self { kind, vocabulary, unk }
    }

    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn contains(&self, word: WordId) -> bool {
        self.vocabulary.contains(&word)
    }

    pub fn vocabulary(&self) -> &BTreeSet<WordId> {
        &self.vocabulary
    }

    /// Catch-all word for out-of-graph audio, if the graph has one
    pub fn unk(&self) -> Option<WordId> {
        self.unk
    }

    /// Maps a unit posterior over `words` onto the words this graph accepts.
    ///
    /// Mass on words outside the graph moves to the catch-all word, or is
    /// dropped when there is none. The result is renormalised and sorted by
    /// descending posterior; `None` when nothing survives.
    pub fn constrain(&self, words: &[WordId], posteriors: &[f32]) -> Option<Vec<(WordId, f32)>> {
        let mut mass: Vec<(WordId, f32)> = Vec::new();

        for (&word, &p) in words.iter().zip(posteriors) {
            let target = if self.contains(word) {
                Some(word)
            } else {
                self.unk
            };
            if let Some(target) = target {
                match mass.iter_mut().find(|(w, _)| *w == target) {
                    Some((_, acc)) => *acc += p,
                    None => mass.push((target, p)),
                }
            }
        }

        let total: f32 = mass.iter().map(|(_, p)| p).sum();
        if total <= f32::EPSILON {
            return None;
        }

        for (_, p) in mass.iter_mut() {
            *p /= total;
        }
        mass.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(mass)
    }
}

/// Graph resources of one model directory
#[derive(Debug, Clone)]
pub enum GraphResources {
    Precompiled(Arc<SearchGraph>),
    Composable {
        /// Words the lexicon can spell; grammars compose over these
        lexicon: BTreeSet<WordId>,
        /// Lexicon composed with the shipped grammar
        full: Arc<SearchGraph>,
    },
}

impl GraphResources {
    /// Loads `graph/HCLr.fst` + `graph/Gr.fst`, else `graph/HCLG.fst`
    pub fn load(graph_dir: &Path, symbols: &SymbolTable) -> VRecogResult<Self> {
        let hclr = graph_dir.join("HCLr.fst");
        let gr = graph_dir.join("Gr.fst");
        let hclg = graph_dir.join("HCLG.fst");

        if hclr.exists() && gr.exists() {
            let lexicon = read_word_list(&hclr, symbols)?;
            let grammar = read_word_list(&gr, symbols)?;
            let vocabulary: BTreeSet<WordId> = lexicon.intersection(&grammar).copied().collect();
            let unk = symbols.find(UNK_WORD).filter(|id| vocabulary.contains(id));

            tracing::debug!(
                "Loaded lookahead graph: lexicon={} words, composed={} words",
                lexicon.len(),
                vocabulary.len()
            );

            Ok(Self::Composable {
                lexicon,
                full: Arc::new(SearchGraph::new(GraphKind::Lookahead, vocabulary, unk)),
            })
        } else if hclg.exists() {
            let vocabulary = read_word_list(&hclg, symbols)?;
            let unk = symbols.find(UNK_WORD).filter(|id| vocabulary.contains(id));

            tracing::debug!("Loaded precompiled graph: {} words", vocabulary.len());

            Ok(Self::Precompiled(Arc::new(SearchGraph::new(
                GraphKind::Precompiled,
                vocabulary,
                unk,
            ))))
        } else {
            Err(VRecogError::model_load(
                graph_dir,
                "neither HCLr.fst + Gr.fst nor HCLG.fst found",
            ))
        }
    }

    /// Full-vocabulary graph
    pub fn full_graph(&self) -> &Arc<SearchGraph> {
        match self {
            Self::Precompiled(graph) => graph,
            Self::Composable { full, .. } => full,
        }
    }

    /// Lexicon available for grammar composition
    pub fn lexicon(&self) -> VRecogResult<&BTreeSet<WordId>> {
        match self {
            Self::Composable { lexicon, .. } => Ok(lexicon),
            Self::Precompiled(_) => Err(VRecogError::UnsupportedGraphType(
                "precompiled HCLG graphs do not support runtime grammars".into(),
            )),
        }
    }

    pub fn is_composable(&self) -> bool {
        matches!(self, Self::Composable { .. })
    }
}

/// One word per line, `#` starts a comment
fn read_word_list(path: &Path, symbols: &SymbolTable) -> VRecogResult<BTreeSet<WordId>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| VRecogError::model_load(path, e.to_string()))?;

    let mut words = BTreeSet::new();
    for (line_num, line) in content.lines().enumerate() {
        let word = line.split('#').next().unwrap_or("").trim();
        if word.is_empty() {
            continue;
        }
        let id = symbols.find(word).ok_or_else(|| {
            VRecogError::model_load(
                path,
                format!("line {}: word '{}' missing from symbol table", line_num + 1, word),
            )
        })?;
        words.insert(id);
    }

    if words.is_empty() {
        return Err(VRecogError::model_load(path, "graph accepts no words"));
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(words: &[WordId], unk: Option<WordId>) -> SearchGraph {
        SearchGraph::new(GraphKind::Lookahead, words.iter().copied().collect(), unk)
    }

    #[test]
    fn test_constrain_keeps_in_graph_words() {
        let g = graph(&[2, 3], None);
        let out = g.constrain(&[2, 3, 4], &[0.2, 0.6, 0.2]).unwrap();

        assert_eq!(out[0].0, 3);
        assert!((out[0].1 - 0.75).abs() < 1e-6);
        assert_eq!(out[1].0, 2);
        assert!((out[1].1 - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_constrain_routes_to_unk() {
        let g = graph(&[1, 2], Some(1));
        let out = g.constrain(&[2, 5, 6], &[0.1, 0.5, 0.4]).unwrap();

        assert_eq!(out[0].0, 1);
        assert!((out[0].1 - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_constrain_nothing_allowed() {
        let g = graph(&[9], None);
        assert!(g.constrain(&[1, 2], &[0.5, 0.5]).is_none());
    }

    #[test]
    fn test_precompiled_has_no_lexicon() {
        let res = GraphResources::Precompiled(Arc::new(graph(&[1], None)));
        assert!(!res.is_composable());
        assert!(matches!(res.lexicon(), Err(VRecogError::UnsupportedGraphType(_))));
    }
}
