//! Span-level precision, recall and F1 over labelled argument spans.
//!
//! Predicate spans (`V`) are not counted.

use std::collections::{BTreeMap, HashSet};

use crate::error::Result;
use crate::tags::{bio_to_spans, parse_tags, VERB_LABEL};

/// True/false positive and false negative counts for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Precision, recall and F1 for one label or overall.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpanScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl SpanCounts {
    pub fn scores(&self) -> SpanScores {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(self.true_positives, self.true_positives + self.false_positives);
        let recall = ratio(self.true_positives, self.true_positives + self.false_negatives);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        SpanScores {
            precision,
            recall,
            f1,
        }
    }

    fn add(&mut self, other: &SpanCounts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }
}

/// Accumulates span matches across frames.
#[derive(Debug, Clone, Default)]
pub struct SpanF1 {
    per_label: BTreeMap<String, SpanCounts>,
}

impl SpanF1 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one frame's predicted and gold BIO sequences.
    pub fn update<S: AsRef<str>>(&mut self, predicted: &[S], gold: &[S]) -> Result<()> {
        let predicted: HashSet<_> = bio_to_spans(&parse_tags(predicted)?)
            .into_iter()
            .filter(|s| s.label != VERB_LABEL)
            .collect();
        let gold: HashSet<_> = bio_to_spans(&parse_tags(gold)?)
            .into_iter()
            .filter(|s| s.label != VERB_LABEL)
            .collect();

        for span in &predicted {
            let counts = self.per_label.entry(span.label.clone()).or_default();
            if gold.contains(span) {
                counts.true_positives += 1;
            } else {
                counts.false_positives += 1;
            }
        }
        for span in gold.difference(&predicted) {
            self.per_label
                .entry(span.label.clone())
                .or_default()
                .false_negatives += 1;
        }
        Ok(())
    }

    /// Counts summed over every label.
    pub fn overall_counts(&self) -> SpanCounts {
        let mut total = SpanCounts::default();
        for counts in self.per_label.values() {
            total.add(counts);
        }
        total
    }

    pub fn overall(&self) -> SpanScores {
        self.overall_counts().scores()
    }

    /// Scores per label, sorted by label.
    pub fn per_label(&self) -> BTreeMap<String, SpanScores> {
        self.per_label
            .iter()
            .map(|(label, counts)| (label.clone(), counts.scores()))
            .collect()
    }
}
