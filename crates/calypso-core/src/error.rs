use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while evaluating an SRL model.
#[derive(Debug, Error)]
pub enum SrlError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a prediction or gold stream failed.
    #[error("failed to write evaluation output: {0}")]
    Output(#[source] std::io::Error),

    /// The experiment configuration is missing a value or holds an invalid one.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// `config.json` is not valid JSON for the expected shape.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A CoNLL-2012 line could not be interpreted.
    #[error("malformed CoNLL data at {path:?}:{line}: {reason}")]
    MalformedConll {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A tag is not `O` and not of the form `B-<type>` / `I-<type>`.
    #[error("invalid BIO tag: {0:?}")]
    InvalidTag(String),

    /// The vocabulary directory is incomplete or a label is unknown.
    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    /// The model weights could not be loaded.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Candle ML framework error.
    #[error("ML inference error: {0}")]
    Candle(#[from] candle_core::Error),

    /// The requested compute device is not available.
    #[error("device {ordinal} is unavailable: {reason}")]
    Device { ordinal: i64, reason: String },

    /// Two sequences that must be aligned token by token are not.
    #[error("sequence length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Neither `--data` nor `validation_data_path` names the evaluation data.
    #[error("no evaluation data: pass a data path or set `validation_data_path` in the configuration")]
    MissingDataPath,
}

impl SrlError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SrlError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for SRL evaluation operations.
pub type Result<T> = std::result::Result<T, SrlError>;
