use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use rand::{seq::SliceRandom, Rng};

use crate::data::batcher::AbstractBatch;
use crate::domain::abstract_text::Abstract;

/// In-memory corpus of abstracts, restricted to those shorter than
/// `max_sentences`.
pub struct AbstractDataset {
    abstracts: Vec<Abstract>,
}

impl AbstractDataset {
    pub fn new(abstracts: Vec<Abstract>, max_sentences: usize) -> Self {
        let total = abstracts.len();
        let abstracts: Vec<Abstract> = abstracts
            .into_iter()
            .filter(|ab| ab.len() < max_sentences)
            .collect();
        if abstracts.len() < total {
            tracing::debug!(
                "Dropped {} abstracts with {} or more sentences",
                total - abstracts.len(),
                max_sentences
            );
        }
        Self { abstracts }
    }

    pub fn abstracts(&self) -> &[Abstract] {
        &self.abstracts
    }

    /// `size` distinct abstracts drawn uniformly.
    pub fn random_batch<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Result<AbstractBatch> {
        if size > self.abstracts.len() {
            bail!(
                "batch size {} exceeds dataset size {}",
                size,
                self.abstracts.len()
            );
        }
        let picked = self
            .abstracts
            .choose_multiple(rng, size)
            .cloned()
            .collect();
        AbstractBatch::new(picked)
    }

    /// Consecutive chunks of `size` abstracts; the last chunk may be short.
    pub fn batches(&self, size: usize) -> impl Iterator<Item = Result<AbstractBatch>> + '_ {
        self.abstracts
            .chunks(size.max(1))
            .map(|chunk| AbstractBatch::new(chunk.to_vec()))
    }
}

impl Dataset<Abstract> for AbstractDataset {
    fn get(&self, index: usize) -> Option<Abstract> {
        self.abstracts.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.abstracts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn ab(n: usize) -> Abstract {
        Abstract::from_token_lists(vec![vec!["x".to_string()]; n]).unwrap()
    }

    fn dataset() -> AbstractDataset {
        AbstractDataset::new(vec![ab(2), ab(3), ab(12), ab(4), ab(5)], 10)
    }

    #[test]
    fn test_long_abstracts_are_filtered() {
        let ds = dataset();
        assert_eq!(ds.len(), 4);
        assert!(ds.abstracts().iter().all(|a| a.len() < 10));
    }

    #[test]
    fn test_random_batch_has_requested_size() {
        let mut rng = StdRng::seed_from_u64(3);
        let batch   = dataset().random_batch(3, &mut rng).unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_random_batch_too_large() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(dataset().random_batch(9, &mut rng).is_err());
    }

    #[test]
    fn test_sequential_batches() {
        let ds = dataset();
        let sizes: Vec<usize> = ds.batches(3).map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![3, 1]);
    }

    #[test]
    fn test_dataset_trait_get() {
        let ds = dataset();
        assert_eq!(ds.get(0).map(|a| a.len()), Some(2));
        assert!(ds.get(10).is_none());
    }
}
