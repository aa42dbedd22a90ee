//! Rolled dice as handed over by the dice engine.
//!
//! Dice outcomes are computed elsewhere; these types only carry the results
//! so they can be pooled and shown by a visualization sink.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Advantage state of a d20 roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

/// One face result of a die. Inactive results were rolled but discarded
/// (the lower die of an advantage roll, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    pub result: u32,
    pub active: bool,
}

/// All results of one dice term, e.g. the three dice of `3d6`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub faces: u32,
    pub results: Vec<DieResult>,
}

impl DiceTerm {
    /// A term whose results are all active.
    pub fn new(faces: u32, results: impl IntoIterator<Item = u32>) -> Self {
        Self {
            faces,
            results: results
                .into_iter()
                .map(|result| DieResult {
                    result,
                    active: true,
                })
                .collect(),
        }
    }

    /// A kept-highest term, as rolled for advantage.
    pub fn keep_highest(faces: u32, results: impl IntoIterator<Item = u32>) -> Self {
        let mut term = Self::new(faces, results);
        if let Some(best) = term.results.iter().map(|r| r.result).max() {
            let mut kept = false;
            for r in &mut term.results {
                r.active = !kept && r.result == best;
                kept |= r.active;
            }
        }
        term
    }

    /// Sum of active results.
    pub fn total(&self) -> u32 {
        self.results.iter().filter(|r| r.active).map(|r| r.result).sum()
    }
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.results.len(), self.faces)
    }
}

/// An evaluated roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    pub formula: String,
    pub terms: Vec<DiceTerm>,
    pub total: i32,
}

impl Roll {
    pub fn new(formula: impl Into<String>, total: i32) -> Self {
        Self {
            formula: formula.into(),
            terms: Vec::new(),
            total,
        }
    }

    /// The `0` roll a dice pool starts from.
    pub fn empty() -> Self {
        Self::new("0", 0)
    }

    pub fn with_term(mut self, term: DiceTerm) -> Self {
        self.terms.push(term);
        self
    }

    /// Dice terms of this roll.
    pub fn dice(&self) -> &[DiceTerm] {
        &self.terms
    }

    /// Number of individual dice across all terms.
    pub fn die_count(&self) -> usize {
        self.terms.iter().map(|t| t.results.len()).sum()
    }

    /// Whether any die was rolled.
    pub fn has_dice(&self) -> bool {
        self.die_count() > 0
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.formula, self.total)
    }
}
