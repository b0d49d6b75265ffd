// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, Result};
use burn::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{batcher::AbstractBatch, embedding::EmbeddingTable};
use crate::domain::{abstract_text::Abstract, traits::SentenceOrderer};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Objective, OrderingModel};

/// A trained model plus the embedding table it was trained against.
pub struct Inferencer<B: Backend> {
    model:      OrderingModel<B>,
    table:      EmbeddingTable,
    max_tokens: usize,
    // contexts and candidate orders are random; each call reseeds from here
    seed:       u64,
    device:     B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(
        model:      OrderingModel<B>,
        table:      EmbeddingTable,
        max_tokens: usize,
        seed:       u64,
        device:     B::Device,
    ) -> Self {
        Self { model, table, max_tokens, seed, device }
    }

    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let table = cfg.embedding_table()?;
        let model: OrderingModel<B> = cfg.model_config().init(&device);
        let model = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint ({} objective)", cfg.objective);
        Ok(Self::new(model, table, cfg.max_tokens, cfg.seed, device))
    }

    /// The objective the loaded model was trained with.
    pub fn objective(&self) -> Objective {
        self.model.objective()
    }

    /// Predicted order of each abstract, encoded together as one batch.
    pub fn order_all(&self, abstracts: &[Abstract]) -> Result<Vec<Vec<usize>>> {
        let batch   = AbstractBatch::new(abstracts.to_vec())?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.model
            .predict_order(&batch, &self.table, self.max_tokens, &self.device, &mut rng)
    }
}

impl<B: Backend> SentenceOrderer for Inferencer<B> {
    fn order(&self, abstract_text: &Abstract) -> Result<Vec<usize>> {
        let order = self
            .order_all(std::slice::from_ref(abstract_text))?
            .pop()
            .ok_or_else(|| anyhow!("model returned no order"))?;
        tracing::debug!("Predicted order {:?}", order);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::SyntheticCorpus;
    use crate::domain::traits::AbstractSource;
    use crate::ml::model::OrderingModelConfig;

    type TestBackend = burn::backend::NdArray;

    fn inferencer(objective: Objective) -> Inferencer<TestBackend> {
        let device: <TestBackend as Backend>::Device = Default::default();
        let model  = OrderingModelConfig::new(4, 3, 8, objective).init::<TestBackend>(&device);
        let table  = SyntheticCorpus::embedding_table(20, 4, 0).unwrap();
        Inferencer::new(model, table, 50, 7, device)
    }

    #[test]
    fn test_order_is_a_permutation() {
        let abstracts = SyntheticCorpus::new(2, 7, 20, 4).load_all().unwrap();
        for objective in Objective::ALL {
            let inf = inferencer(objective);
            assert_eq!(inf.objective(), objective);
            for ab in &abstracts {
                let mut order = inf.order(ab).unwrap();
                order.sort();
                assert_eq!(order, (0..ab.len()).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_order_is_deterministic() {
        let ab = SyntheticCorpus::new(1, 7, 20, 9).load_all().unwrap().remove(0);
        for objective in [Objective::Regression, Objective::LeftRight, Objective::Shuffle] {
            let inf = inferencer(objective);
            assert_eq!(inf.order(&ab).unwrap(), inf.order(&ab).unwrap());
        }
    }

    #[test]
    fn test_order_all_matches_batch_size() {
        let abstracts = SyntheticCorpus::new(3, 5, 20, 1).load_all().unwrap();
        let orders = inferencer(Objective::Pairwise).order_all(&abstracts).unwrap();
        assert_eq!(orders.len(), 3);
    }
}
