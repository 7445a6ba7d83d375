//! # CoNLL Evaluation Output
//!
//! Writes predicted and gold SRL frames in the bracketed column layout read
//! by the CoNLL-2005 `srl-eval.pl` scorer. Each token line is the predicate
//! column (the verb on the predicate's row, `-` elsewhere) followed by the
//! bracketed argument label; a blank line ends every frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SrlError};
use crate::tags::{parse_tags, BioTag};

/// Column width used for both the word and the label column.
const COLUMN_WIDTH: usize = 15;

/// Convert BIO tags to the bracketed span notation, e.g.
/// `B-ARG0 I-ARG0 O B-V` becomes `(ARG0* *) * (V*)`.
pub fn convert_bio_tags_to_conll_format(labels: &[BioTag]) -> Vec<String> {
    let len = labels.len();
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let Some(span_type) = label.span_type() else {
                return "*".to_string();
            };

            let mut conll = String::from("*");
            let opens = label.is_begin()
                || i == 0
                || labels[i - 1].span_type() != Some(span_type);
            if opens {
                conll.insert_str(0, &format!("({span_type}"));
            }

            let closes = i == len - 1
                || labels[i + 1].is_begin()
                || labels[i + 1].span_type() != Some(span_type);
            if closes {
                conll.push(')');
            }
            conll
        })
        .collect()
}

/// Write one frame to the prediction and gold streams.
///
/// `verb_index` of `None` means the sentence has no predicate, so the
/// predicate column is all `-`.
pub fn write_to_conll_eval_file<P: Write, G: Write>(
    prediction_file: &mut P,
    gold_file: &mut G,
    verb_index: Option<usize>,
    sentence: &[String],
    prediction: &[String],
    gold_labels: &[String],
) -> Result<()> {
    for (what, actual) in [("prediction", prediction.len()), ("gold labels", gold_labels.len())] {
        if actual != sentence.len() {
            return Err(SrlError::LengthMismatch {
                what,
                expected: sentence.len(),
                actual,
            });
        }
    }

    let mut verb_only_sentence: Vec<&str> = vec!["-"; sentence.len()];
    if let Some(idx) = verb_index {
        let word = sentence.get(idx).ok_or(SrlError::LengthMismatch {
            what: "verb index",
            expected: sentence.len(),
            actual: idx + 1,
        })?;
        verb_only_sentence[idx] = word.as_str();
    }

    let predicted = convert_bio_tags_to_conll_format(&parse_tags(prediction)?);
    let gold = convert_bio_tags_to_conll_format(&parse_tags(gold_labels)?);

    for ((word, predicted), gold) in verb_only_sentence.iter().zip(&predicted).zip(&gold) {
        writeln!(prediction_file, "{word:<width$}{predicted:>width$}", width = COLUMN_WIDTH)
            .map_err(SrlError::Output)?;
        writeln!(gold_file, "{word:<width$}{gold:>width$}", width = COLUMN_WIDTH)
            .map_err(SrlError::Output)?;
    }
    writeln!(prediction_file).map_err(SrlError::Output)?;
    writeln!(gold_file).map_err(SrlError::Output)?;
    Ok(())
}

/// Paired prediction/gold output files.
pub struct ConllEvalWriter<W: Write> {
    predictions: W,
    gold: W,
    frames: usize,
}

/// Output paths for a serialization directory and prefix.
pub fn output_paths(serialization_dir: &Path, prefix: &str) -> (PathBuf, PathBuf) {
    (
        serialization_dir.join(format!("{prefix}_predictions.txt")),
        serialization_dir.join(format!("{prefix}_gold.txt")),
    )
}

impl ConllEvalWriter<BufWriter<File>> {
    /// Create (or truncate) both files.
    pub fn create(prediction_path: &Path, gold_path: &Path) -> Result<Self> {
        let predictions =
            File::create(prediction_path).map_err(|e| SrlError::io(prediction_path, e))?;
        let gold = File::create(gold_path).map_err(|e| SrlError::io(gold_path, e))?;
        Ok(Self::new(BufWriter::new(predictions), BufWriter::new(gold)))
    }
}

impl<W: Write> ConllEvalWriter<W> {
    pub fn new(predictions: W, gold: W) -> Self {
        Self {
            predictions,
            gold,
            frames: 0,
        }
    }

    pub fn write_frame(
        &mut self,
        verb_index: Option<usize>,
        sentence: &[String],
        prediction: &[String],
        gold_labels: &[String],
    ) -> Result<()> {
        write_to_conll_eval_file(
            &mut self.predictions,
            &mut self.gold,
            verb_index,
            sentence,
            prediction,
            gold_labels,
        )?;
        self.frames += 1;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Flush both streams and hand them back.
    pub fn finish(mut self) -> Result<(W, W)> {
        self.predictions.flush().map_err(SrlError::Output)?;
        self.gold.flush().map_err(SrlError::Output)?;
        Ok((self.predictions, self.gold))
    }
}
