//! A single SRL training/evaluation instance: one predicate frame of one sentence.

use crate::error::{Result, SrlError};

/// Tokens of a sentence, the indicator of the frame's predicate and its gold tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrlInstance {
    pub tokens: Vec<String>,
    pub verb_indicator: Vec<u8>,
    pub tags: Vec<String>,
    /// Source document, e.g. `bc/cnn/00/cnn_0000`.
    pub document_id: String,
}

impl SrlInstance {
    pub fn new(
        tokens: Vec<String>,
        verb_indicator: Vec<u8>,
        tags: Vec<String>,
        document_id: impl Into<String>,
    ) -> Result<Self> {
        if verb_indicator.len() != tokens.len() {
            return Err(SrlError::LengthMismatch {
                what: "verb indicator",
                expected: tokens.len(),
                actual: verb_indicator.len(),
            });
        }
        if tags.len() != tokens.len() {
            return Err(SrlError::LengthMismatch {
                what: "gold tags",
                expected: tokens.len(),
                actual: tags.len(),
            });
        }
        Ok(Self {
            tokens,
            verb_indicator,
            tags,
            document_id: document_id.into(),
        })
    }

    /// Position of the predicate: the first token whose indicator is 1.
    ///
    /// Most sentences have a verbal predicate, but not all; those yield `None`.
    pub fn verb_index(&self) -> Option<usize> {
        self.verb_indicator.iter().position(|&flag| flag == 1)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
