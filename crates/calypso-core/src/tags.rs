//! # BIO Tags for Semantic Role Labeling
//!
//! SRL frames are encoded with the BIO (Begin-Inside-Outside) scheme over an
//! open label set (`ARG0`, `ARGM-TMP`, `V`, ...). The label set comes from the
//! model's vocabulary, so tags are parsed from strings rather than enumerated.

use std::fmt;

use crate::error::{Result, SrlError};

/// The role label of the predicate itself.
pub const VERB_LABEL: &str = "V";

/// A parsed BIO tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BioTag {
    Begin(String),
    Inside(String),
    Outside,
}

impl BioTag {
    /// Parse `O`, `B-<type>` or `I-<type>`.
    pub fn parse(tag: &str) -> Result<Self> {
        if tag == "O" {
            return Ok(BioTag::Outside);
        }
        match tag.split_once('-') {
            Some(("B", label)) if !label.is_empty() => Ok(BioTag::Begin(label.to_string())),
            Some(("I", label)) if !label.is_empty() => Ok(BioTag::Inside(label.to_string())),
            _ => Err(SrlError::InvalidTag(tag.to_string())),
        }
    }

    /// Check if this is a "Begin" tag.
    pub fn is_begin(&self) -> bool {
        matches!(self, BioTag::Begin(_))
    }

    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, BioTag::Inside(_))
    }

    /// The span type this tag belongs to, `None` for `O`.
    pub fn span_type(&self) -> Option<&str> {
        match self {
            BioTag::Begin(label) | BioTag::Inside(label) => Some(label),
            BioTag::Outside => None,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is valid.
    ///
    /// `I-X` may only follow `B-X` or `I-X`; everything else is allowed.
    pub fn is_valid_transition(from: &BioTag, to: &BioTag) -> bool {
        match to {
            BioTag::Inside(label) => from.span_type() == Some(label.as_str()),
            _ => true,
        }
    }

    /// Whether a sequence may start with this tag.
    pub fn is_valid_start(&self) -> bool {
        !self.is_inside()
    }
}

impl fmt::Display for BioTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BioTag::Begin(label) => write!(f, "B-{label}"),
            BioTag::Inside(label) => write!(f, "I-{label}"),
            BioTag::Outside => write!(f, "O"),
        }
    }
}

/// Parse every tag of a sequence.
pub fn parse_tags<S: AsRef<str>>(tags: &[S]) -> Result<Vec<BioTag>> {
    tags.iter().map(|t| BioTag::parse(t.as_ref())).collect()
}

/// Pairwise transition constraints for a label set indexed like the vocabulary.
///
/// Returns `allowed[from][to]` and the per-tag start constraint.
pub fn transition_constraints(tags: &[BioTag]) -> (Vec<Vec<bool>>, Vec<bool>) {
    let allowed = tags
        .iter()
        .map(|from| {
            tags.iter()
                .map(|to| BioTag::is_valid_transition(from, to))
                .collect()
        })
        .collect();
    let start = tags.iter().map(BioTag::is_valid_start).collect();
    (allowed, start)
}

/// A labelled span over token indices, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedSpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

/// Extract labelled spans from a BIO sequence.
///
/// An `I-X` that does not continue an open `X` span starts a new span, so
/// ill-formed predictions still yield every labelled token.
pub fn bio_to_spans(tags: &[BioTag]) -> Vec<TypedSpan> {
    let mut spans = Vec::new();
    let mut open: Option<TypedSpan> = None;

    for (i, tag) in tags.iter().enumerate() {
        match tag {
            BioTag::Outside => {
                spans.extend(open.take());
            }
            BioTag::Begin(label) => {
                spans.extend(open.take());
                open = Some(TypedSpan {
                    label: label.clone(),
                    start: i,
                    end: i,
                });
            }
            BioTag::Inside(label) => match open.as_mut() {
                Some(span) if span.label == *label => span.end = i,
                _ => {
                    spans.extend(open.take());
                    open = Some(TypedSpan {
                        label: label.clone(),
                        start: i,
                        end: i,
                    });
                }
            },
        }
    }
    spans.extend(open);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(raw: &[&str]) -> Vec<BioTag> {
        parse_tags(raw).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        for raw in ["O", "B-ARG0", "I-ARGM-TMP", "B-V", "B-R-ARG1"] {
            assert_eq!(BioTag::parse(raw).unwrap().to_string(), raw);
        }
        assert_eq!(
            BioTag::parse("I-ARGM-TMP").unwrap().span_type(),
            Some("ARGM-TMP")
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["", "B", "B-", "X-ARG0", "ARG0"] {
            assert!(matches!(BioTag::parse(raw), Err(SrlError::InvalidTag(_))));
        }
    }

    #[test]
    fn test_valid_transitions() {
        let b0 = BioTag::Begin("ARG0".into());
        let i0 = BioTag::Inside("ARG0".into());
        assert!(BioTag::is_valid_transition(&b0, &i0));
        assert!(BioTag::is_valid_transition(&i0, &i0));
        assert!(BioTag::is_valid_transition(&BioTag::Outside, &b0));
        assert!(BioTag::is_valid_transition(&i0, &BioTag::Outside));
    }

    #[test]
    fn test_invalid_transitions() {
        let b0 = BioTag::Begin("ARG0".into());
        let i1 = BioTag::Inside("ARG1".into());
        assert!(!BioTag::is_valid_transition(&BioTag::Outside, &i1));
        assert!(!BioTag::is_valid_transition(&b0, &i1));
        assert!(!i1.is_valid_start());
    }

    #[test]
    fn test_transition_constraints_shape() {
        let label_set = tags(&["O", "B-ARG0", "I-ARG0", "B-V"]);
        let (allowed, start) = transition_constraints(&label_set);
        assert_eq!(allowed.len(), 4);
        assert!(allowed[1][2]);
        assert!(!allowed[0][2]);
        assert!(!allowed[3][2]);
        assert_eq!(start, vec![true, true, false, true]);
    }

    #[test]
    fn test_bio_to_spans() {
        let seq = tags(&["B-ARG0", "I-ARG0", "B-V", "O", "I-ARG1", "I-ARG1", "B-ARG2"]);
        let spans = bio_to_spans(&seq);
        let summary: Vec<_> = spans
            .iter()
            .map(|s| (s.label.as_str(), s.start, s.end))
            .collect();
        assert_eq!(
            summary,
            vec![("ARG0", 0, 1), ("V", 2, 2), ("ARG1", 4, 5), ("ARG2", 6, 6)]
        );
    }
}
