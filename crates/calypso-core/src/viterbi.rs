//! # Constrained Viterbi Decoding
//!
//! Finds the highest scoring tag sequence given per-token emission scores,
//! a transition score matrix and hard BIO constraints.

use crate::error::{Result, SrlError};
use crate::tags::{transition_constraints, BioTag};

/// Viterbi decoder over a fixed label set.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
    allowed: Vec<Vec<bool>>,
    allowed_start: Vec<bool>,
}

impl ViterbiDecoder {
    /// Create a decoder whose constraints follow the BIO scheme of `tags`.
    ///
    /// `tags` must be indexed exactly like the model's label namespace.
    pub fn new(tags: &[BioTag]) -> Self {
        let (allowed, allowed_start) = transition_constraints(tags);
        Self {
            num_tags: tags.len(),
            allowed,
            allowed_start,
        }
    }

    /// Create a decoder without any constraint.
    pub fn unconstrained(num_tags: usize) -> Self {
        Self {
            num_tags,
            allowed: vec![vec![true; num_tags]; num_tags],
            allowed_start: vec![true; num_tags],
        }
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    /// Decode the optimal tag sequence.
    ///
    /// # Arguments
    /// * `emission_scores` - Matrix of shape [seq_len, num_tags]
    /// * `transition_matrix` - Matrix of shape [num_tags, num_tags], `[from][to]`
    ///
    /// # Returns
    /// The optimal tag sequence as indices.
    pub fn decode(
        &self,
        emission_scores: &[Vec<f32>],
        transition_matrix: &[Vec<f32>],
    ) -> Result<Vec<usize>> {
        let seq_len = emission_scores.len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }

        if let Some(row) = emission_scores.iter().find(|row| row.len() != self.num_tags) {
            return Err(SrlError::LengthMismatch {
                what: "emission scores",
                expected: self.num_tags,
                actual: row.len(),
            });
        }
        if transition_matrix.len() != self.num_tags
            || transition_matrix.iter().any(|row| row.len() != self.num_tags)
        {
            return Err(SrlError::LengthMismatch {
                what: "transition matrix",
                expected: self.num_tags,
                actual: transition_matrix.len(),
            });
        }

        let mut dp: Vec<Vec<f32>> = vec![vec![f32::NEG_INFINITY; self.num_tags]; seq_len];
        let mut backptr: Vec<Vec<usize>> = vec![vec![0; self.num_tags]; seq_len];

        for tag in 0..self.num_tags {
            if self.allowed_start[tag] {
                dp[0][tag] = emission_scores[0][tag];
            }
        }

        for pos in 1..seq_len {
            for curr_tag in 0..self.num_tags {
                let mut best_score = f32::NEG_INFINITY;
                let mut best_prev = 0;

                for prev_tag in 0..self.num_tags {
                    if !self.allowed[prev_tag][curr_tag] {
                        continue;
                    }

                    let score = dp[pos - 1][prev_tag] + transition_matrix[prev_tag][curr_tag];
                    if score > best_score {
                        best_score = score;
                        best_prev = prev_tag;
                    }
                }

                dp[pos][curr_tag] = best_score + emission_scores[pos][curr_tag];
                backptr[pos][curr_tag] = best_prev;
            }
        }

        // Ties resolve to the lowest index.
        let mut best_final_tag = 0;
        let mut best_final_score = f32::NEG_INFINITY;
        for tag in 0..self.num_tags {
            if dp[seq_len - 1][tag] > best_final_score {
                best_final_score = dp[seq_len - 1][tag];
                best_final_tag = tag;
            }
        }

        let mut path = vec![best_final_tag];
        let mut curr_tag = best_final_tag;
        for pos in (1..seq_len).rev() {
            curr_tag = backptr[pos][curr_tag];
            path.push(curr_tag);
        }

        path.reverse();
        Ok(path)
    }
}
