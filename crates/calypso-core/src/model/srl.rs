//! # BiLSTM Semantic Role Labeler
//!
//! Token embeddings are concatenated with a learned embedding of the binary
//! verb indicator, encoded by a stacked bidirectional LSTM and projected to
//! per-token label scores. Decoding runs constrained Viterbi over the label
//! log-probabilities so predictions are always well-formed BIO sequences.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Dropout, Embedding, Linear, VarBuilder};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::data::Batch;
use crate::error::{Result, SrlError};
use crate::model::lstm::StackedBiLstm;
use crate::tags::parse_tags;
use crate::viterbi::ViterbiDecoder;
use crate::vocab::Vocabulary;

/// Weights file inside a serialization directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// Model types accepted in `model.type`.
pub const MODEL_TYPES: &[&str] = &["srl", "semantic_role_labeler"];

/// A BiLSTM tagger conditioned on the predicate position.
pub struct SrlModel {
    token_embedding: Embedding,
    embedding_dropout: Dropout,
    verb_embedding: Embedding,
    encoder: StackedBiLstm,
    tag_projection: Linear,
    /// `[num_labels, num_labels]` transition scores, `[from][to]`.
    transitions: Vec<Vec<f32>>,
    vocab: Vocabulary,
    decoder: ViterbiDecoder,
    training: bool,
}

/// Resolve a device id: negative means CPU, otherwise a CUDA ordinal.
pub fn device_from_ordinal(ordinal: i64) -> Result<Device> {
    if ordinal < 0 {
        return Ok(Device::Cpu);
    }
    Device::new_cuda(ordinal as usize).map_err(|e| SrlError::Device {
        ordinal,
        reason: e.to_string(),
    })
}

impl SrlModel {
    /// Build the model from a var builder (safetensors or a fresh `VarMap`).
    pub fn new(vb: VarBuilder, config: &ModelConfig, vocab: Vocabulary) -> Result<Self> {
        if !MODEL_TYPES.contains(&config.model_type.as_str()) {
            return Err(SrlError::Config(format!(
                "unsupported model type {:?}, expected one of {MODEL_TYPES:?}",
                config.model_type
            )));
        }

        let num_labels = vocab.num_labels();
        let token_embedding = candle_nn::embedding(
            vocab.token_vocab_size(),
            config.embedding_dim(),
            vb.pp("token_embedding"),
        )?;
        let verb_embedding =
            candle_nn::embedding(2, config.binary_feature_dim, vb.pp("binary_feature_embedding"))?;
        let encoder = StackedBiLstm::load(
            config.embedding_dim() + config.binary_feature_dim,
            config.hidden_size(),
            config.num_layers(),
            vb.pp("encoder"),
        )?;
        let tag_projection =
            candle_nn::linear(encoder.output_dim(), num_labels, vb.pp("tag_projection"))?;

        // Learned transitions are optional; hard BIO constraints apply regardless.
        let transitions = if vb.contains_tensor("crf_transitions") {
            debug!("using learned transition scores");
            vb.get((num_labels, num_labels), "crf_transitions")?
                .to_dtype(DType::F32)?
                .to_vec2::<f32>()?
        } else {
            vec![vec![0.0; num_labels]; num_labels]
        };

        let decoder = ViterbiDecoder::new(&parse_tags(vocab.labels())?);

        Ok(Self {
            token_embedding,
            embedding_dropout: Dropout::new(config.embedding_dropout),
            verb_embedding,
            encoder,
            tag_projection,
            transitions,
            vocab,
            decoder,
            training: true,
        })
    }

    /// Load `model.safetensors` from a serialization directory onto `device`.
    pub fn load(
        serialization_dir: &Path,
        config: &ModelConfig,
        vocab: Vocabulary,
        device: &Device,
    ) -> Result<Self> {
        let weights = serialization_dir.join(WEIGHTS_FILE);
        if !weights.exists() {
            return Err(SrlError::ModelLoad(format!(
                "weights not found at {}",
                weights.display()
            )));
        }

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[&weights], DType::F32, device) }
            .map_err(|e| SrlError::ModelLoad(e.to_string()))?;
        let model = Self::new(vb, config, vocab)?;
        info!(
            weights = %weights.display(),
            labels = model.vocab.num_labels(),
            layers = config.num_layers(),
            "loaded SRL model"
        );
        Ok(model)
    }

    /// Switch to evaluation mode: embedding dropout is disabled.
    pub fn eval(&mut self) {
        self.training = false;
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Per-token label logits, `[batch, max_len, num_labels]`.
    pub fn forward(&self, batch: &Batch) -> Result<Tensor> {
        let tokens = self.token_embedding.forward(&batch.token_ids)?;
        let tokens = self.embedding_dropout.forward(&tokens, self.training)?;
        let verbs = self.verb_embedding.forward(&batch.verb_indicator)?;
        let embedded = Tensor::cat(&[tokens, verbs], D::Minus1)?;
        let encoded = self.encoder.forward(&embedded, &batch.mask)?;
        Ok(self.tag_projection.forward(&encoded)?)
    }

    /// Most likely well-formed tag sequence for every row of the batch.
    pub fn decode(&self, logits: &Tensor, batch: &Batch) -> Result<Vec<Vec<String>>> {
        // Log-probabilities, not probabilities: transition scores are added on this scale.
        let log_probs = candle_nn::ops::log_softmax(logits, D::Minus1)?.to_vec3::<f32>()?;

        let mut predictions = Vec::with_capacity(batch.size());
        for (row, &len) in log_probs.into_iter().zip(batch.lengths.iter()) {
            let path = self.decoder.decode(&row[..len], &self.transitions)?;
            let tags = path
                .into_iter()
                .map(|idx| {
                    self.vocab
                        .label_from_index(idx)
                        .map(str::to_string)
                        .ok_or_else(|| SrlError::Vocabulary(format!("label index {idx} out of range")))
                })
                .collect::<Result<Vec<_>>>()?;
            predictions.push(tags);
        }
        Ok(predictions)
    }

    /// `forward` followed by `decode`.
    pub fn predict(&self, batch: &Batch) -> Result<Vec<Vec<String>>> {
        let logits = self.forward(batch)?;
        self.decode(&logits, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BatchIterator, SrlInstance};
    use crate::tags::BioTag;
    use crate::vocab::UNKNOWN_TOKEN;
    use candle_nn::VarMap;

    fn config() -> ModelConfig {
        serde_json::from_value(serde_json::json!({
            "type": "srl",
            "text_field_embedder": {"tokens": {"type": "embedding", "embedding_dim": 6}},
            "encoder": {"type": "alternating_lstm", "hidden_size": 5, "num_layers": 2},
            "binary_feature_dim": 2
        }))
        .unwrap()
    }

    fn vocab() -> Vocabulary {
        Vocabulary::new(
            vec![UNKNOWN_TOKEN.into(), "the".into(), "cat".into(), "sat".into()],
            ["O", "B-ARG0", "I-ARG0", "B-V", "B-ARG1", "I-ARG1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
        .unwrap()
    }

    fn instance(words: &[&str], verb: usize) -> SrlInstance {
        let n = words.len();
        let mut indicator = vec![0; n];
        indicator[verb] = 1;
        SrlInstance::new(
            words.iter().map(|w| w.to_string()).collect(),
            indicator,
            vec!["O".to_string(); n],
            "doc",
        )
        .unwrap()
    }

    #[test]
    fn test_forward_and_decode_shapes() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mut model = SrlModel::new(vb, &config(), vocab()).unwrap();
        assert!(model.is_training());
        model.eval();
        assert!(!model.is_training());

        let instances = vec![instance(&["the", "cat", "sat"], 2), instance(&["sat"], 0)];
        let iterator = BatchIterator::new(32).unwrap();
        let batch = iterator
            .batches(&instances, model.vocab(), &Device::Cpu)
            .next()
            .unwrap()
            .unwrap();

        let logits = model.forward(&batch).unwrap();
        assert_eq!(logits.dims(), &[2, 3, 6]);

        let predictions = model.decode(&logits, &batch).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].len(), 3);
        assert_eq!(predictions[1].len(), 1);

        for tags in &predictions {
            let parsed = parse_tags(tags).unwrap();
            assert!(parsed[0].is_valid_start());
            for pair in parsed.windows(2) {
                assert!(BioTag::is_valid_transition(&pair[0], &pair[1]));
            }
        }
    }

    #[test]
    fn test_embedding_dropout_only_in_training() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mut config = config();
        config.embedding_dropout = 0.5;
        let mut model = SrlModel::new(vb, &config, vocab()).unwrap();

        let instances = vec![instance(&["the", "cat", "sat", "the", "cat", "sat"], 2)];
        let batch = BatchIterator::new(32)
            .unwrap()
            .batches(&instances, model.vocab(), &Device::Cpu)
            .next()
            .unwrap()
            .unwrap();
        let logits = |model: &SrlModel| {
            model
                .forward(&batch)
                .unwrap()
                .flatten_all()
                .unwrap()
                .to_vec1::<f32>()
                .unwrap()
        };

        assert_ne!(logits(&model), logits(&model));

        model.eval();
        assert_eq!(logits(&model), logits(&model));
    }

    #[test]
    fn test_unknown_model_type() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mut config = config();
        config.model_type = "crf_tagger".into();
        assert!(matches!(
            SrlModel::new(vb, &config, vocab()),
            Err(SrlError::Config(_))
        ));
    }

    #[test]
    fn test_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let err = SrlModel::load(dir.path(), &config(), vocab(), &Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, SrlError::ModelLoad(_)));
    }

    #[test]
    fn test_cpu_device() {
        assert!(device_from_ordinal(-1).unwrap().is_cpu());
    }
}
