//! Utterance lattice
//!
//! A confusion network: one slot per word position, each slot holding the
//! competing words with their posteriors. The MBR path takes the best word
//! of every slot; n-best lists are enumerated lazily in order of total
//! confidence (product of posteriors).

use crate::model::{RescoringLm, WordId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A decoded word in frame units
#[derive(Debug, Clone, PartialEq)]
pub struct HypWord {
    pub word: WordId,
    pub start_frame: usize,
    /// Exclusive
    pub end_frame: usize,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeSlot {
    pub start_frame: usize,
    pub end_frame: usize,
    /// Sorted by descending posterior, never empty
    pub candidates: Vec<(WordId, f32)>,
}

/// One entry of an n-best list
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
    pub words: Vec<WordId>,
    pub confidence: f32,
    /// Position in search order
    pub rank: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lattice {
    slots: Vec<LatticeSlot>,
}

struct Pending {
    score: f32,
    seq: usize,
    choice: Vec<usize>,
    /// Only slots from here on may be advanced, so each combination is
    /// generated once
    pivot: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl Lattice {
    pub fn new(slots: Vec<LatticeSlot>) -> Self {
        Self {
            slots: slots.into_iter().filter(|s| !s.candidates.is_empty()).collect(),
        }
    }

    pub fn slots(&self) -> &[LatticeSlot] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Minimum Bayes risk path: the most probable word of every slot
    pub fn best_path(&self) -> Vec<HypWord> {
        self.slots
            .iter()
            .map(|slot| HypWord {
                word: slot.candidates[0].0,
                start_frame: slot.start_frame,
                end_frame: slot.end_frame,
                confidence: slot.candidates[0].1,
            })
            .collect()
    }

    /// Up to `n` hypotheses by non-increasing confidence, ties in search
    /// order. An empty lattice yields the single empty hypothesis.
    pub fn nbest(&self, n: usize) -> Vec<Hypothesis> {
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }

        let mut heap = BinaryHeap::new();
        let mut seq = 0;
        let first = vec![0; self.slots.len()];
        heap.push(Pending {
            score: self.score(&first),
            seq,
            choice: first,
            pivot: 0,
        });

        while let Some(entry) = heap.pop() {
            for i in entry.pivot..self.slots.len() {
                if entry.choice[i] + 1 < self.slots[i].candidates.len() {
                    let mut choice = entry.choice.clone();
                    choice[i] += 1;
                    seq += 1;
                    heap.push(Pending {
                        score: self.score(&choice),
                        seq,
                        choice,
                        pivot: i,
                    });
                }
            }

            out.push(Hypothesis {
                words: entry
                    .choice
                    .iter()
                    .zip(&self.slots)
                    .map(|(&c, slot)| slot.candidates[c].0)
                    .collect(),
                confidence: entry.score,
                rank: out.len(),
            });
            if out.len() == n {
                break;
            }
        }

        out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then(a.rank.cmp(&b.rank)));
        out
    }

    /// Reweight candidates with unigram LM scores and renormalise per slot
    pub fn rescore(&mut self, lm: &RescoringLm, lm_weight: f32) {
        for slot in &mut self.slots {
            for (word, p) in slot.candidates.iter_mut() {
                *p *= 10f32.powf(lm_weight * lm.logprob(*word));
            }
            let total: f32 = slot.candidates.iter().map(|(_, p)| p).sum();
            if total > 0.0 {
                slot.candidates.iter_mut().for_each(|(_, p)| *p /= total);
            }
            slot.candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
    }

    fn score(&self, choice: &[usize]) -> f32 {
        choice
            .iter()
            .zip(&self.slots)
            .map(|(&c, slot)| slot.candidates[c].1)
            .product()
    }
}
