//! # Calypso Core
//!
//! Semantic role labeling evaluation: reads OntoNotes SRL frames, runs a
//! trained BiLSTM tagger and writes predictions and gold labels in the
//! CoNLL format scored by `srl-eval.pl`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use calypso_core::{evaluate, EvaluationConfig};
//!
//! let mut options = EvaluationConfig::new("models/srl-bilstm");
//! options.prefix = "dev".into();
//! let report = evaluate::run(&options).unwrap();
//!
//! println!("wrote {}", report.prediction_path.display());
//! ```
pub mod config;
pub mod conll;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod model;
pub mod tags;
pub mod viterbi;
pub mod vocab;

// Re-export primary API
pub use config::{DatasetReaderConfig, ExperimentConfig, ModelConfig};
pub use conll::{convert_bio_tags_to_conll_format, write_to_conll_eval_file, ConllEvalWriter};
pub use data::{Batch, BatchIterator, OntonotesReader, SrlInstance};
pub use error::{Result, SrlError};
pub use evaluate::{EvaluationConfig, EvaluationReport};
pub use metrics::{SpanCounts, SpanF1, SpanScores};
pub use model::{device_from_ordinal, SrlModel};
pub use tags::BioTag;
pub use viterbi::ViterbiDecoder;
pub use vocab::Vocabulary;
