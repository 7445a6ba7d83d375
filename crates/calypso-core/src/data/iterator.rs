//! Fixed-size, order-preserving batching of instances into padded tensors.

use candle_core::{Device, Tensor};

use crate::data::instance::SrlInstance;
use crate::error::{Result, SrlError};
use crate::vocab::Vocabulary;

/// Padded tensors for one batch.
#[derive(Debug)]
pub struct Batch {
    /// `[batch, max_len]` token indices, padding is 0.
    pub token_ids: Tensor,
    /// `[batch, max_len]` 0/1 predicate indicator.
    pub verb_indicator: Tensor,
    /// `[batch, max_len]` f32 mask, 1.0 on real tokens.
    pub mask: Tensor,
    /// Unpadded length of every row.
    pub lengths: Vec<usize>,
}

impl Batch {
    pub fn size(&self) -> usize {
        self.lengths.len()
    }

    pub fn max_len(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0)
    }
}

/// Iterator configuration, similar to a basic bucket-free iterator: instances
/// are never shuffled or reordered, so batch outputs line up with the input.
#[derive(Debug, Clone)]
pub struct BatchIterator {
    batch_size: usize,
    lowercase_tokens: bool,
}

impl BatchIterator {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(SrlError::Config("batch size must be positive".into()));
        }
        Ok(Self {
            batch_size,
            lowercase_tokens: false,
        })
    }

    /// Lowercase tokens before vocabulary lookup.
    pub fn with_lowercase_tokens(mut self, lowercase: bool) -> Self {
        self.lowercase_tokens = lowercase;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches needed for `num_instances`.
    pub fn num_batches(&self, num_instances: usize) -> usize {
        num_instances.div_ceil(self.batch_size)
    }

    /// Lazily index and pad the instances, one chunk at a time.
    pub fn batches<'a>(
        &'a self,
        instances: &'a [SrlInstance],
        vocab: &'a Vocabulary,
        device: &'a Device,
    ) -> impl Iterator<Item = Result<Batch>> + 'a {
        instances
            .chunks(self.batch_size)
            .map(move |chunk| self.tensorize(chunk, vocab, device))
    }

    fn tensorize(
        &self,
        chunk: &[SrlInstance],
        vocab: &Vocabulary,
        device: &Device,
    ) -> Result<Batch> {
        let lengths: Vec<usize> = chunk.iter().map(SrlInstance::len).collect();
        // Empty sentences still get one padded column so the tensors are never 0-wide.
        let max_len = lengths.iter().copied().max().unwrap_or(0).max(1);
        let rows = chunk.len();
        let padding = vocab.padding_index() as u32;

        let mut token_ids = vec![padding; rows * max_len];
        let mut verb_indicator = vec![0u32; rows * max_len];
        let mut mask = vec![0f32; rows * max_len];

        for (row, instance) in chunk.iter().enumerate() {
            let offset = row * max_len;
            for (col, token) in instance.tokens.iter().enumerate() {
                let idx = if self.lowercase_tokens {
                    vocab.token_index(&token.to_lowercase())
                } else {
                    vocab.token_index(token)
                };
                token_ids[offset + col] = idx as u32;
                verb_indicator[offset + col] = u32::from(instance.verb_indicator[col]);
                mask[offset + col] = 1.0;
            }
        }

        Ok(Batch {
            token_ids: Tensor::from_vec(token_ids, (rows, max_len), device)?,
            verb_indicator: Tensor::from_vec(verb_indicator, (rows, max_len), device)?,
            mask: Tensor::from_vec(mask, (rows, max_len), device)?,
            lengths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::UNKNOWN_TOKEN;

    fn vocab() -> Vocabulary {
        Vocabulary::new(
            vec![UNKNOWN_TOKEN.into(), "the".into(), "cat".into(), "sat".into()],
            vec!["O".into(), "B-V".into()],
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
    fn test_batches_preserve_order_and_pad() {
        let vocab = vocab();
        let instances = vec![
            instance(&["the", "cat", "sat"], 2),
            instance(&["cat", "sat"], 1),
            instance(&["The", "dog"], 0),
        ];
        let iterator = BatchIterator::new(2).unwrap();
        assert_eq!(iterator.num_batches(instances.len()), 2);

        let batches: Vec<Batch> = iterator
            .batches(&instances, &vocab, &Device::Cpu)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].lengths, vec![3, 2]);
        assert_eq!(batches[1].lengths, vec![2]);

        let ids = batches[0].token_ids.to_vec2::<u32>().unwrap();
        assert_eq!(ids, vec![vec![2, 3, 4], vec![3, 4, 0]]);
        let mask = batches[0].mask.to_vec2::<f32>().unwrap();
        assert_eq!(mask[1], vec![1.0, 1.0, 0.0]);
        let verbs = batches[0].verb_indicator.to_vec2::<u32>().unwrap();
        assert_eq!(verbs, vec![vec![0, 0, 1], vec![0, 1, 0]]);

        // "The" is unknown without lowercasing.
        let ids = batches[1].token_ids.to_vec2::<u32>().unwrap();
        assert_eq!(ids, vec![vec![1, 1]]);
    }

    #[test]
    fn test_lowercasing() {
        let vocab = vocab();
        let instances = vec![instance(&["The", "CAT"], 0)];
        let iterator = BatchIterator::new(32).unwrap().with_lowercase_tokens(true);
        let batch = iterator
            .batches(&instances, &vocab, &Device::Cpu)
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(batch.token_ids.to_vec2::<u32>().unwrap(), vec![vec![2, 3]]);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(BatchIterator::new(0).is_err());
    }
}
