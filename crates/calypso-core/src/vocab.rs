//! Vocabulary loaded from a serialization directory.
//!
//! Layout: `vocabulary/<namespace>.txt`, one entry per line. Padded
//! namespaces reserve index 0 for padding and expect the unknown token on the
//! first line of the file; namespaces ending in `labels` or `tags` are not
//! padded and have no unknown entry.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, SrlError};

pub const VOCABULARY_DIR: &str = "vocabulary";
pub const TOKENS_NAMESPACE: &str = "tokens";
pub const LABELS_NAMESPACE: &str = "labels";
pub const PADDING_TOKEN: &str = "@@PADDING@@";
pub const UNKNOWN_TOKEN: &str = "@@UNKNOWN@@";

/// A single namespace's index mapping.
#[derive(Debug, Clone, Default)]
struct Namespace {
    index_to_token: Vec<String>,
    token_to_index: HashMap<String, usize>,
    padded: bool,
}

impl Namespace {
    fn new(entries: Vec<String>, padded: bool) -> Result<Self> {
        let mut index_to_token = Vec::with_capacity(entries.len() + 1);
        if padded {
            index_to_token.push(PADDING_TOKEN.to_string());
        }
        index_to_token.extend(entries);

        let mut token_to_index = HashMap::with_capacity(index_to_token.len());
        for (idx, token) in index_to_token.iter().enumerate() {
            if token_to_index.insert(token.clone(), idx).is_some() {
                return Err(SrlError::Vocabulary(format!("duplicate entry {token:?}")));
            }
        }
        if padded && !token_to_index.contains_key(UNKNOWN_TOKEN) {
            return Err(SrlError::Vocabulary(format!(
                "padded namespace is missing {UNKNOWN_TOKEN}"
            )));
        }

        Ok(Self {
            index_to_token,
            token_to_index,
            padded,
        })
    }
}

/// Token and label vocabulary of a trained model.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Namespace,
    labels: Namespace,
}

fn is_padded_namespace(name: &str) -> bool {
    !(name.ends_with("labels") || name.ends_with("tags"))
}

fn read_namespace(dir: &Path, name: &str) -> Result<Namespace> {
    let path = dir.join(format!("{name}.txt"));
    let raw = std::fs::read_to_string(&path).map_err(|e| SrlError::io(&path, e))?;
    // Entries may contain spaces, so only the line terminator is stripped.
    let entries = raw
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .filter(|line| !line.is_empty())
        .collect();
    Namespace::new(entries, is_padded_namespace(name))
}

impl Vocabulary {
    /// Build a vocabulary in memory. `tokens` should start with the unknown token.
    pub fn new(tokens: Vec<String>, labels: Vec<String>) -> Result<Self> {
        Ok(Self {
            tokens: Namespace::new(tokens, true)?,
            labels: Namespace::new(labels, false)?,
        })
    }

    /// Load `<dir>/tokens.txt` and `<dir>/labels.txt`.
    pub fn from_files(dir: &Path) -> Result<Self> {
        let tokens = read_namespace(dir, TOKENS_NAMESPACE)?;
        let labels = read_namespace(dir, LABELS_NAMESPACE)?;
        if labels.index_to_token.is_empty() {
            return Err(SrlError::Vocabulary("label namespace is empty".into()));
        }
        Ok(Self { tokens, labels })
    }

    /// Load the vocabulary stored alongside a model.
    pub fn from_serialization_dir(dir: &Path) -> Result<Self> {
        Self::from_files(&dir.join(VOCABULARY_DIR))
    }

    /// Index of a token, falling back to the unknown token.
    pub fn token_index(&self, token: &str) -> usize {
        self.tokens
            .token_to_index
            .get(token)
            .or_else(|| self.tokens.token_to_index.get(UNKNOWN_TOKEN))
            .copied()
            .unwrap_or(0)
    }

    /// Index of a label; unknown labels are an error.
    pub fn label_index(&self, label: &str) -> Result<usize> {
        self.labels
            .token_to_index
            .get(label)
            .copied()
            .ok_or_else(|| SrlError::Vocabulary(format!("unknown label {label:?}")))
    }

    pub fn label_from_index(&self, idx: usize) -> Option<&str> {
        self.labels.index_to_token.get(idx).map(String::as_str)
    }

    /// All labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels.index_to_token
    }

    pub fn token_vocab_size(&self) -> usize {
        self.tokens.index_to_token.len()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.index_to_token.len()
    }

    pub fn padding_index(&self) -> usize {
        debug_assert!(self.tokens.padded);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_vocab(dir: &Path, tokens: &str, labels: &str) {
        std::fs::write(dir.join("tokens.txt"), tokens).unwrap();
        std::fs::write(dir.join("labels.txt"), labels).unwrap();
    }

    #[test]
    fn test_padded_and_unpadded_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        write_vocab(dir.path(), "@@UNKNOWN@@\nthe\ncat\n", "O\nB-ARG0\nI-ARG0\nB-V\n");

        let vocab = Vocabulary::from_files(dir.path()).unwrap();
        assert_eq!(vocab.token_vocab_size(), 4);
        assert_eq!(vocab.token_index("the"), 2);
        assert_eq!(vocab.token_index("dog"), 1);
        assert_eq!(vocab.padding_index(), 0);

        assert_eq!(vocab.num_labels(), 4);
        assert_eq!(vocab.label_index("O").unwrap(), 0);
        assert_eq!(vocab.label_from_index(3), Some("B-V"));
        assert!(vocab.label_index("B-ARG9").is_err());
    }

    #[test]
    fn test_missing_unknown_token_is_rejected() {
        let err = Vocabulary::new(vec!["the".into()], vec!["O".into()]).unwrap_err();
        assert!(matches!(err, SrlError::Vocabulary(_)));
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let err = Vocabulary::new(
            vec![UNKNOWN_TOKEN.into()],
            vec!["O".into(), "O".into()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Vocabulary::from_files(dir.path()).unwrap_err();
        assert!(err.to_string().contains("tokens.txt"));
    }
}
