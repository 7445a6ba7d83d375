//! # Experiment Configuration
//!
//! Typed view over the `config.json` stored in a serialization directory.
//! Only the keys the evaluator reads are modelled; everything else is kept
//! verbatim in `extra` so the configuration survives a round trip.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, SrlError};

/// Name of the configuration file inside a serialization directory.
pub const CONFIG_FILE: &str = "config.json";

/// Batch size used unless the caller overrides it.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Top-level experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub dataset_reader: DatasetReaderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_data_path: Option<String>,
    pub model: ModelConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `dataset_reader` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReaderConfig {
    #[serde(rename = "type")]
    pub reader_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_indexers: Option<TokenIndexersConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `dataset_reader.token_indexers` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenIndexersConfig {
    #[serde(default)]
    pub tokens: Option<SingleIdIndexerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SingleIdIndexerConfig {
    #[serde(default)]
    pub lowercase_tokens: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `model` section of an SRL experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(rename = "type")]
    pub model_type: String,
    pub text_field_embedder: TextFieldEmbedderConfig,
    pub encoder: EncoderConfig,
    pub binary_feature_dim: usize,
    #[serde(default)]
    pub embedding_dropout: f32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `model.text_field_embedder`: either `{"tokens": {..}}` or
/// `{"token_embedders": {"tokens": {..}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextFieldEmbedderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenEmbedderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_embedders: Option<TokenEmbeddersConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenEmbeddersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenEmbedderConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Embedder for the `tokens` namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEmbedderConfig {
    pub embedding_dim: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `model.encoder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(rename = "type")]
    pub encoder_type: String,
    pub hidden_size: usize,
    #[serde(default = "default_num_layers")]
    pub num_layers: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_num_layers() -> usize {
    1
}

impl TextFieldEmbedderConfig {
    fn tokens(&self) -> Option<&TokenEmbedderConfig> {
        self.tokens.as_ref().or_else(|| {
            self.token_embedders
                .as_ref()
                .and_then(|embedders| embedders.tokens.as_ref())
        })
    }
}

impl ModelConfig {
    /// Width of the `tokens` embedding, or 0 when no token embedder is configured.
    pub fn embedding_dim(&self) -> usize {
        self.text_field_embedder
            .tokens()
            .map(|tokens| tokens.embedding_dim)
            .unwrap_or(0)
    }

    pub fn hidden_size(&self) -> usize {
        self.encoder.hidden_size
    }

    pub fn num_layers(&self) -> usize {
        self.encoder.num_layers
    }
}

impl ExperimentConfig {
    /// Load `config.json` from a serialization directory.
    pub fn from_serialization_dir(dir: &Path) -> Result<Self> {
        Self::from_file(&dir.join(CONFIG_FILE))
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SrlError::io(path, e))?;
        let config: ExperimentConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let model = &self.model;
        if model.text_field_embedder.tokens().is_none() {
            return Err(SrlError::Config(
                "model.text_field_embedder has no `tokens` embedder".into(),
            ));
        }
        if model.embedding_dim() == 0 || model.hidden_size() == 0 {
            return Err(SrlError::Config(
                "token embedding_dim and encoder.hidden_size must be positive".into(),
            ));
        }
        if model.num_layers() == 0 {
            return Err(SrlError::Config("model.encoder.num_layers must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&model.embedding_dropout) {
            return Err(SrlError::Config(format!(
                "model.embedding_dropout must be in [0, 1), got {}",
                model.embedding_dropout
            )));
        }
        Ok(())
    }

    /// Inject or clear the reader's domain filter and return the output prefix.
    ///
    /// With a domain the reader only reads that domain and the prefix becomes
    /// `"{domain}_{prefix}"`. Without one any configured filter is removed, so
    /// evaluation always covers the full dataset unless asked otherwise.
    pub fn apply_domain(&mut self, domain: Option<&str>, prefix: &str) -> String {
        match domain {
            Some(domain) => {
                self.dataset_reader.domain_identifier = Some(domain.to_string());
                format!("{domain}_{prefix}")
            }
            None => {
                match self.dataset_reader.domain_identifier.take() {
                    Some(previous) => {
                        debug!(domain = %previous, "removed configured domain_identifier")
                    }
                    None => debug!("no domain_identifier configured; nothing to remove"),
                }
                prefix.to_string()
            }
        }
    }

    /// Whether the token indexer lowercases tokens before lookup.
    pub fn lowercase_tokens(&self) -> bool {
        self.dataset_reader
            .token_indexers
            .as_ref()
            .and_then(|indexers| indexers.tokens.as_ref())
            .map(|tokens| tokens.lowercase_tokens)
            .unwrap_or(false)
    }
}
