//! # OntoNotes (CoNLL-2012) Reader
//!
//! Reads `*gold_conll` files and produces one [`SrlInstance`] per predicate
//! frame. Column layout per token line:
//!
//! | col | content |
//! |-----|---------|
//! | 0 | document id |
//! | 1 | part number |
//! | 2 | word number |
//! | 3 | word |
//! | 4 | POS tag |
//! | 5 | parse bit |
//! | 6 | predicate lemma |
//! | 7 | predicate frameset id |
//! | 8 | word sense |
//! | 9 | speaker |
//! | 10 | named entities |
//! | 11..N-1 | one SRL span column per predicate |
//! | N-1 | coreference |

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::DatasetReaderConfig;
use crate::data::instance::SrlInstance;
use crate::error::{Result, SrlError};

/// Reader types accepted in `dataset_reader.type`.
pub const READER_TYPES: &[&str] = &["srl", "ontonotes_srl"];

const MIN_COLUMNS: usize = 12;
const WORD_COLUMN: usize = 3;
const FIRST_SRL_COLUMN: usize = 11;
const GOLD_CONLL_SUFFIX: &str = "gold_conll";

/// Dataset reader for OntoNotes SRL annotations.
#[derive(Debug, Clone, Default)]
pub struct OntonotesReader {
    domain_identifier: Option<String>,
}

/// Accumulates the lines of one sentence.
#[derive(Debug, Default)]
struct SentenceBuilder {
    document_id: String,
    words: Vec<String>,
    /// One BIO sequence per SRL column.
    frames: Vec<Vec<String>>,
    open_spans: Vec<Option<String>>,
}

impl SentenceBuilder {
    fn push_line(&mut self, columns: &[&str], path: &Path, line: usize) -> Result<()> {
        if columns.len() < MIN_COLUMNS {
            return Err(SrlError::MalformedConll {
                path: path.to_path_buf(),
                line,
                reason: format!(
                    "expected at least {MIN_COLUMNS} columns, found {}",
                    columns.len()
                ),
            });
        }

        let annotations = &columns[FIRST_SRL_COLUMN..columns.len() - 1];
        if self.words.is_empty() {
            self.document_id = columns[0].to_string();
            self.frames = vec![Vec::new(); annotations.len()];
            self.open_spans = vec![None; annotations.len()];
        } else if annotations.len() != self.frames.len() {
            return Err(SrlError::MalformedConll {
                path: path.to_path_buf(),
                line,
                reason: format!(
                    "expected {} SRL columns, found {}",
                    self.frames.len(),
                    annotations.len()
                ),
            });
        }

        let word = match columns[WORD_COLUMN] {
            "/." | "/?" => &columns[WORD_COLUMN][1..],
            other => other,
        };
        self.words.push(word.to_string());

        for (idx, annotation) in annotations.iter().enumerate() {
            let label = annotation.trim_matches(|c| c == '(' || c == ')' || c == '*');
            let tag = if annotation.contains('(') {
                self.open_spans[idx] = Some(label.to_string());
                format!("B-{label}")
            } else if let Some(open) = &self.open_spans[idx] {
                format!("I-{open}")
            } else {
                "O".to_string()
            };
            self.frames[idx].push(tag);

            if annotation.contains(')') {
                self.open_spans[idx] = None;
            }
        }
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<SrlInstance>) -> Result<()> {
        if self.words.is_empty() {
            return Ok(());
        }
        let builder = std::mem::take(self);
        let len = builder.words.len();

        if builder.frames.is_empty() {
            out.push(SrlInstance::new(
                builder.words,
                vec![0; len],
                vec!["O".to_string(); len],
                builder.document_id,
            )?);
            return Ok(());
        }

        for tags in builder.frames {
            let verb_indicator = tags.iter().map(|t| u8::from(t.ends_with("-V"))).collect();
            out.push(SrlInstance::new(
                builder.words.clone(),
                verb_indicator,
                tags,
                builder.document_id.clone(),
            )?);
        }
        Ok(())
    }
}

/// Parse CoNLL-2012 lines into instances. `path` is only used in errors.
pub fn parse_conll<R: BufRead>(reader: R, path: &Path) -> Result<Vec<SrlInstance>> {
    let mut instances = Vec::new();
    let mut sentence = SentenceBuilder::default();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| SrlError::io(path, e))?;
        let line = line.trim();

        if line.is_empty() {
            sentence.finish(&mut instances)?;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let columns: Vec<&str> = line.split_whitespace().collect();
        sentence.push_line(&columns, path, line_idx + 1)?;
    }

    // The final sentence may lack a trailing blank line.
    sentence.finish(&mut instances)?;
    Ok(instances)
}

impl OntonotesReader {
    pub fn new(domain_identifier: Option<String>) -> Self {
        Self { domain_identifier }
    }

    /// Build the reader described by the `dataset_reader` configuration section.
    pub fn from_config(config: &DatasetReaderConfig) -> Result<Self> {
        if !READER_TYPES.contains(&config.reader_type.as_str()) {
            return Err(SrlError::Config(format!(
                "unsupported dataset_reader type {:?}, expected one of {READER_TYPES:?}",
                config.reader_type
            )));
        }
        Ok(Self::new(config.domain_identifier.clone()))
    }

    pub fn domain_identifier(&self) -> Option<&str> {
        self.domain_identifier.as_deref()
    }

    fn in_domain(&self, path: &Path) -> bool {
        match &self.domain_identifier {
            Some(domain) => path.components().any(|c| c.as_os_str() == domain.as_str()),
            None => true,
        }
    }

    /// Every annotation file under `path`, sorted, filtered by domain.
    pub fn dataset_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
                SrlError::io(at, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let file = entry.path();
            let is_annotation = file
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(GOLD_CONLL_SUFFIX));
            if is_annotation && self.in_domain(file) {
                files.push(file.to_path_buf());
            }
        }
        Ok(files)
    }

    /// Read one annotation file.
    pub fn read_file(&self, path: &Path) -> Result<Vec<SrlInstance>> {
        let file = File::open(path).map_err(|e| SrlError::io(path, e))?;
        parse_conll(BufReader::new(file), path)
    }

    /// Read every instance under `path` (a file or a directory tree).
    pub fn read(&self, path: &Path) -> Result<Vec<SrlInstance>> {
        let files = if path.is_file() {
            if self.in_domain(path) {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            }
        } else {
            self.dataset_files(path)?
        };

        let mut instances = Vec::new();
        for file in &files {
            let before = instances.len();
            instances.extend(self.read_file(file)?);
            debug!(file = %file.display(), instances = instances.len() - before, "read annotation file");
        }

        info!(
            files = files.len(),
            instances = instances.len(),
            domain = self.domain_identifier.as_deref().unwrap_or("all"),
            "read evaluation data"
        );
        Ok(instances)
    }
}
