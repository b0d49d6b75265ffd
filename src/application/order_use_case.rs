// ============================================================
// Layer 2 — Order Use Case
// ============================================================
// Reorders held-out abstracts with a trained checkpoint:
//   1. Load the training config from the checkpoint directory
//   2. Regenerate the corpus and take the validation split
//   3. Shuffle `count` validation abstracts (seeded)
//   4. Predict an order for each and report it next to the gold one

use anyhow::{bail, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::application::train_use_case::DeviceChoice;
use crate::domain::{abstract_text::Abstract, traits::SentenceOrderer};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

/// One shuffled abstract with its gold and predicted orders, both given
/// as indices into the shuffled sentence list.
#[derive(Debug, Clone)]
pub struct OrderedAbstract {
    pub shuffled:  Abstract,
    pub gold:      Vec<usize>,
    pub predicted: Vec<usize>,
}

impl OrderedAbstract {
    /// Original positions in predicted order; `[0, 1, .., n-1]` when the
    /// prediction is exactly right. Fails if `predicted` is not a
    /// permutation of the shuffled sentences.
    pub fn predicted_positions(&self) -> Result<Vec<usize>> {
        let predicted = self.shuffled.reordered(&self.predicted)?;
        Ok(predicted.sentences().iter().map(|s| s.position()).collect())
    }

    pub fn is_exact(&self) -> bool {
        self.gold == self.predicted
    }
}

pub struct OrderUseCase {
    ckpt:   CheckpointManager,
    device: Option<DeviceChoice>,
    count:  usize,
}

impl OrderUseCase {
    /// `device` overrides the one recorded at training time.
    pub fn new(checkpoint_dir: String, device: Option<DeviceChoice>, count: usize) -> Result<Self> {
        let ckpt = CheckpointManager::new(&checkpoint_dir)?;
        Ok(Self { ckpt, device, count })
    }

    pub fn execute(&self) -> Result<Vec<OrderedAbstract>> {
        let cfg    = self.ckpt.load_config()?;
        let device = self.device.unwrap_or(cfg.device);

        let (_, val) = cfg.train_val_split()?;
        let val: Vec<Abstract> = val
            .into_iter()
            .filter(|ab| ab.len() < cfg.max_sentences)
            .take(self.count)
            .collect();
        if val.is_empty() {
            bail!("no held-out abstracts to order");
        }

        let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(3));
        let shuffled: Vec<Abstract> = val.iter().map(|ab| ab.shuffled(&mut rng)).collect();

        tracing::info!("Ordering {} abstracts on {}", shuffled.len(), device);
        match device {
            DeviceChoice::Cpu => self.run(Inferencer::<NdArray>::from_checkpoint(&self.ckpt, NdArrayDevice::Cpu)?, shuffled),
            DeviceChoice::Gpu => self.run(Inferencer::<Wgpu>::from_checkpoint(&self.ckpt, WgpuDevice::default())?, shuffled),
        }
    }

    fn run<B: Backend>(&self, inferencer: Inferencer<B>, shuffled: Vec<Abstract>) -> Result<Vec<OrderedAbstract>> {
        tracing::debug!("Decoding with the {} head", inferencer.objective());
        shuffled
            .into_iter()
            .map(|ab| {
                let predicted = inferencer.order(&ab)?;
                let gold      = ab.gold_order();
                Ok(OrderedAbstract { shuffled: ab, gold, predicted })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::ml::model::Objective;

    #[test]
    fn test_predicted_positions_map_through_shuffle() {
        let ab = Abstract::from_token_lists(vec![
            vec!["a".into()],
            vec!["b".into()],
            vec!["c".into()],
        ])
        .unwrap();
        let shuffled = ab.reordered(&[2, 0, 1]).unwrap();
        let gold     = shuffled.gold_order();
        let report   = OrderedAbstract { shuffled, gold: gold.clone(), predicted: gold };
        assert_eq!(report.predicted_positions().unwrap(), vec![0, 1, 2]);
        assert!(report.is_exact());
    }

    #[test]
    fn test_predicted_positions_reject_non_permutation() {
        let shuffled = Abstract::from_token_lists(vec![vec!["a".into()], vec!["b".into()]]).unwrap();
        let report   = OrderedAbstract { shuffled, gold: vec![0, 1], predicted: vec![1, 1] };
        assert!(report.predicted_positions().is_err());
    }

    #[test]
    fn test_train_then_order() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            checkpoint_dir: dir.path().display().to_string(),
            objective:      Objective::Regression,
            epochs:         1,
            epoch_size:     1,
            batch_size:     2,
            lstm_dim:       3,
            lin_dim:        4,
            embedding_dim:  4,
            vocab_size:     20,
            num_abstracts:  10,
            max_sentences:  5,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg.clone()).execute().unwrap();

        let reports = OrderUseCase::new(cfg.checkpoint_dir, None, 2)
            .unwrap()
            .execute()
            .unwrap();
        assert!(!reports.is_empty());
        for r in &reports {
            let mut positions = r.predicted_positions().unwrap();
            positions.sort();
            assert_eq!(positions, (0..r.shuffled.len()).collect::<Vec<_>>());
        }
    }
}
