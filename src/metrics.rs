//! Bracket-based evaluation of predicted trees against gold trees.
//!
//! Scores are micro-averaged: matched, predicted and gold bracket counts
//! are summed over the corpus before precision and recall are computed.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::tree::{Bracket, RstTree};

/// Granularity at which brackets are compared.
///
/// Each level widens the equality key of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricLevel {
    /// EDU range only
    Span,
    /// EDU range and nuclearity form
    Nuclearity,
    /// EDU range, nuclearity form and relation
    Relation,
}

impl MetricLevel {
    pub const ALL: [MetricLevel; 3] = [
        MetricLevel::Span,
        MetricLevel::Nuclearity,
        MetricLevel::Relation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricLevel::Span => "span",
            MetricLevel::Nuclearity => "nuclearity",
            MetricLevel::Relation => "relation",
        }
    }
}

impl fmt::Display for MetricLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running bracket counts for one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketCounts {
    pub matched: usize,
    pub predicted: usize,
    pub gold: usize,
}

impl BracketCounts {
    pub fn precision(&self) -> f64 {
        ratio(self.matched, self.predicted, self.gold)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.matched, self.gold, self.predicted)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }
}

/// `num / denom`, treating two empty bracket sets as a perfect match.
fn ratio(num: usize, denom: usize, other: usize) -> f64 {
    match (denom, other) {
        (0, 0) => 1.0,
        (0, _) => 0.0,
        _ => num as f64 / denom as f64,
    }
}

/// Corpus-level accumulator.
#[derive(Debug, Clone)]
pub struct Metrics {
    levels: Vec<MetricLevel>,
    counts: Vec<BracketCounts>,
    documents: usize,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(&MetricLevel::ALL)
    }
}

impl Metrics {
    pub fn new(levels: &[MetricLevel]) -> Self {
        let mut levels = levels.to_vec();
        levels.sort();
        levels.dedup();
        Self {
            counts: vec![BracketCounts::default(); levels.len()],
            levels,
            documents: 0,
        }
    }

    pub fn levels(&self) -> &[MetricLevel] {
        &self.levels
    }

    /// Number of documents evaluated so far.
    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Add one document's brackets to the running totals.
    pub fn eval(&mut self, gold: &RstTree, pred: &RstTree) {
        self.eval_brackets(&gold.bracketing(), &pred.bracketing());
    }

    pub fn eval_brackets(&mut self, gold: &[Bracket], pred: &[Bracket]) {
        for (level, counts) in self.levels.iter().zip(self.counts.iter_mut()) {
            let doc = match level {
                MetricLevel::Span => count_matches(gold, pred, |b| b.eduspan),
                MetricLevel::Nuclearity => count_matches(gold, pred, |b| (b.eduspan, b.form)),
                MetricLevel::Relation => {
                    count_matches(gold, pred, |b| (b.eduspan, b.form, b.relation.as_str()))
                }
            };
            counts.matched += doc.matched;
            counts.predicted += doc.predicted;
            counts.gold += doc.gold;
        }
        self.documents += 1;
    }

    pub fn counts(&self, level: MetricLevel) -> Option<BracketCounts> {
        self.levels
            .iter()
            .position(|&l| l == level)
            .map(|idx| self.counts[idx])
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            documents: self.documents,
            rows: self
                .levels
                .iter()
                .zip(&self.counts)
                .map(|(&level, counts)| LevelScore {
                    level,
                    precision: counts.precision(),
                    recall: counts.recall(),
                    f1: counts.f1(),
                    counts: *counts,
                })
                .collect(),
        }
    }
}

fn count_matches<'a, K, F>(gold: &'a [Bracket], pred: &'a [Bracket], key: F) -> BracketCounts
where
    K: Eq + Hash,
    F: Fn(&'a Bracket) -> K,
{
    let gold_keys: HashSet<K> = gold.iter().map(&key).collect();
    let pred_keys: HashSet<K> = pred.iter().map(&key).collect();
    BracketCounts {
        matched: gold_keys.intersection(&pred_keys).count(),
        predicted: pred_keys.len(),
        gold: gold_keys.len(),
    }
}

/// Scores for one level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelScore {
    pub level: MetricLevel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub counts: BracketCounts,
}

/// Final precision/recall/F1 table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub documents: usize,
    pub rows: Vec<LevelScore>,
}

impl MetricsReport {
    pub fn level(&self, level: MetricLevel) -> Option<&LevelScore> {
        self.rows.iter().find(|row| row.level == level)
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "documents: {}", self.documents)?;
        write!(f, "{:<12}{:>10}{:>10}{:>10}", "level", "precision", "recall", "f1")?;
        for row in &self.rows {
            write!(
                f,
                "\n{:<12}{:>10.4}{:>10.4}{:>10.4}",
                row.level.as_str(),
                row.precision,
                row.recall,
                row.f1
            )?;
        }
        Ok(())
    }
}
