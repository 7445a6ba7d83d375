//! # Evaluation Pipeline
//!
//! Loads a trained model from its serialization directory, predicts over an
//! evaluation set and writes `<prefix>_predictions.txt` / `<prefix>_gold.txt`
//! next to the model for the external CoNLL scorer.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ExperimentConfig, DEFAULT_BATCH_SIZE};
use crate::conll::{output_paths, ConllEvalWriter};
use crate::data::{BatchIterator, OntonotesReader};
use crate::error::{Result, SrlError};
use crate::metrics::{SpanF1, SpanScores};
use crate::model::{device_from_ordinal, SrlModel};
use crate::vocab::Vocabulary;

/// How often (in batches) progress is logged.
const PROGRESS_EVERY: usize = 50;

/// Options for one evaluation run.
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Directory with `config.json`, `vocabulary/` and `model.safetensors`.
    pub serialization_dir: PathBuf,
    /// Device id: -1 for CPU, otherwise a CUDA ordinal.
    pub device: i64,
    /// Evaluation data; defaults to the experiment's `validation_data_path`.
    pub data: Option<PathBuf>,
    /// Distinguishes output files of different models or datasets.
    pub prefix: String,
    /// Restrict evaluation to one OntoNotes domain, e.g. `nw` or `bc`.
    pub domain: Option<String>,
    /// Overrides the default batch size of 32.
    pub batch_size: Option<usize>,
}

impl EvaluationConfig {
    pub fn new(serialization_dir: impl Into<PathBuf>) -> Self {
        Self {
            serialization_dir: serialization_dir.into(),
            device: -1,
            data: None,
            prefix: String::new(),
            domain: None,
            batch_size: None,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub prediction_path: PathBuf,
    pub gold_path: PathBuf,
    pub data_path: PathBuf,
    pub instances: usize,
    /// Frames whose verb indicator had no predicate.
    pub frames_without_verb: usize,
    pub scores: SpanScores,
}

fn evaluation_data_path(options: &EvaluationConfig, config: &ExperimentConfig) -> Result<PathBuf> {
    options
        .data
        .clone()
        .or_else(|| config.validation_data_path.as_ref().map(PathBuf::from))
        .ok_or(SrlError::MissingDataPath)
}

/// Batch size for inference; the experiment's own iterator settings are not used.
fn evaluation_batch_size(options: &EvaluationConfig) -> usize {
    options.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Run the full evaluation and write both CoNLL files.
pub fn run(options: &EvaluationConfig) -> Result<EvaluationReport> {
    let dir: &Path = &options.serialization_dir;
    let mut config = ExperimentConfig::from_serialization_dir(dir)?;
    let prefix = config.apply_domain(options.domain.as_deref(), &options.prefix);

    let reader = OntonotesReader::from_config(&config.dataset_reader)?;
    let data_path = evaluation_data_path(options, &config)?;

    let device = device_from_ordinal(options.device)?;
    let vocab = Vocabulary::from_serialization_dir(dir)?;
    let mut model = SrlModel::load(dir, &config.model, vocab, &device)?;
    model.eval();

    let (prediction_path, gold_path) = output_paths(dir, &prefix);
    let mut writer = ConllEvalWriter::create(&prediction_path, &gold_path)?;

    info!("reading evaluation data from {}", data_path.display());
    let instances = reader.read(&data_path)?;

    let iterator = BatchIterator::new(evaluation_batch_size(options))?.with_lowercase_tokens(config.lowercase_tokens());
    let num_batches = iterator.num_batches(instances.len());

    let mut predictions = Vec::with_capacity(instances.len());
    for (idx, batch) in iterator
        .batches(&instances, model.vocab(), &device)
        .enumerate()
    {
        let batch = batch?;
        predictions.extend(model.predict(&batch)?);
        if (idx + 1) % PROGRESS_EVERY == 0 || idx + 1 == num_batches {
            info!(batch = idx + 1, of = num_batches, "predicted");
        }
    }

    if predictions.len() != instances.len() {
        return Err(SrlError::LengthMismatch {
            what: "predictions",
            expected: instances.len(),
            actual: predictions.len(),
        });
    }

    let mut metric = SpanF1::new();
    let mut frames_without_verb = 0;
    for (instance, prediction) in instances.iter().zip(&predictions) {
        let verb_index = instance.verb_index();
        if verb_index.is_none() {
            frames_without_verb += 1;
        }
        writer.write_frame(verb_index, &instance.tokens, prediction, &instance.tags)?;
        metric.update(prediction.as_slice(), instance.tags.as_slice())?;
    }
    let frames = writer.frames();
    writer.finish()?;
    debug!(frames, frames_without_verb, "wrote CoNLL evaluation files");

    let scores = metric.overall();
    info!(
        predictions = %prediction_path.display(),
        gold = %gold_path.display(),
        precision = scores.precision,
        recall = scores.recall,
        f1 = scores.f1,
        "evaluation complete"
    );

    Ok(EvaluationReport {
        prediction_path,
        gold_path,
        data_path,
        instances: instances.len(),
        frames_without_verb,
        scores,
    })
}
