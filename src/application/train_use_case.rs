// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run:
//
//   Step 1: Resolve the device              (once, from config)
//   Step 2: Build the embedding table       (Layer 4 - data)
//   Step 3: Generate the corpus             (Layer 4 - data)
//   Step 4: Split train/validation          (Layer 4 - data)
//   Step 5: Build datasets                  (Layer 4 - data)
//   Step 6: Save config                     (Layer 6 - infra)
//   Step 7: Run training loop               (Layer 5 - ml)

use std::{fmt, str::FromStr};

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::MAX_SENTENCE_TOKENS,
    dataset::AbstractDataset,
    embedding::EmbeddingTable,
    splitter::split_train_val,
    synthetic::SyntheticCorpus,
};
use crate::domain::{abstract_text::Abstract, traits::AbstractSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{Objective, OrderingModelConfig};
use crate::ml::trainer::{run_training, EpochSummary};

// ─── DeviceChoice ─────────────────────────────────────────────────────────────
/// Where tensors live. Resolved once from the CLI and threaded through
/// every call; nothing reads the environment mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    /// NdArray backend
    Cpu,
    /// Wgpu backend
    Gpu,
}

impl fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceChoice::Cpu => f.write_str("cpu"),
            DeviceChoice::Gpu => f.write_str("gpu"),
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu"                   => Ok(DeviceChoice::Cpu),
            "gpu" | "wgpu" | "cuda" => Ok(DeviceChoice::Gpu),
            other => Err(format!("unknown device '{other}' (cpu | gpu)")),
        }
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// Serialisable so the `order` command can rebuild the same model,
// embedding table and held-out split from the checkpoint directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub checkpoint_dir: String,
    pub objective:      Objective,
    pub device:         DeviceChoice,
    pub epochs:         usize,
    /// Random batches drawn per epoch.
    pub epoch_size:     usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub lstm_dim:       usize,
    pub lin_dim:        usize,
    /// Tokens kept per sentence.
    pub max_tokens:     usize,
    /// Abstracts with this many sentences or more are skipped.
    pub max_sentences:  usize,
    pub num_abstracts:  usize,
    pub vocab_size:     usize,
    pub embedding_dim:  usize,
    pub train_fraction: f64,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "checkpoints".to_string(),
            objective:      Objective::Regression,
            device:         DeviceChoice::Cpu,
            epochs:         10,
            epoch_size:     100,
            batch_size:     10,
            lr:             1e-3,
            lstm_dim:       64,
            lin_dim:        64,
            max_tokens:     MAX_SENTENCE_TOKENS,
            max_sentences:  10,
            num_abstracts:  2000,
            vocab_size:     500,
            embedding_dim:  32,
            train_fraction: 0.8,
            seed:           1,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be positive");
        }
        if self.max_tokens == 0 {
            bail!("max_tokens must be positive");
        }
        if self.lstm_dim == 0 || self.lin_dim == 0 || self.embedding_dim == 0 {
            bail!("lstm_dim, lin_dim and embedding_dim must be positive");
        }
        if !(0.0..=1.0).contains(&self.train_fraction) {
            bail!("train_fraction must lie in [0, 1], got {}", self.train_fraction);
        }
        Ok(())
    }

    pub fn model_config(&self) -> OrderingModelConfig {
        OrderingModelConfig::new(self.embedding_dim, self.lstm_dim, self.lin_dim, self.objective)
    }

    /// The embedding table every run with this config shares.
    pub fn embedding_table(&self) -> Result<EmbeddingTable> {
        SyntheticCorpus::embedding_table(self.vocab_size, self.embedding_dim, self.seed)
    }

    fn corpus(&self) -> SyntheticCorpus {
        SyntheticCorpus::new(
            self.num_abstracts,
            self.max_sentences,
            self.vocab_size,
            self.seed.wrapping_add(1),
        )
    }

    /// Regenerate the corpus and split it exactly as training did.
    pub fn train_val_split(&self) -> Result<(Vec<Abstract>, Vec<Abstract>)> {
        let abstracts = self.corpus().load_all()?;
        let mut rng   = StdRng::seed_from_u64(self.seed.wrapping_add(2));
        Ok(split_train_val(abstracts, self.train_fraction, &mut rng))
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vec<EpochSummary>> {
        let cfg = &self.config;
        cfg.validate()?;

        tracing::info!(
            "Training {} objective on {} (seed={})",
            cfg.objective,
            cfg.device,
            cfg.seed
        );

        // ── Embedding table: owned here, lent to every encoding call ─────────
        let table = cfg.embedding_table()?;
        tracing::info!("Embedding table: {} tokens x {} dims", table.len(), table.dim());

        // ── Corpus and split ──────────────────────────────────────────────────
        let (train_abstracts, val_abstracts) = cfg.train_val_split()?;
        let train_dataset = AbstractDataset::new(train_abstracts, cfg.max_sentences);
        let val_dataset   = AbstractDataset::new(val_abstracts, cfg.max_sentences);
        tracing::info!(
            "Split: {} train, {} validation",
            train_dataset.abstracts().len(),
            val_dataset.abstracts().len()
        );

        // ── Save config for inference ─────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        tracing::info!("Checkpoints go to {}", ckpt_manager.dir().display());

        run_training(cfg, &train_dataset, &val_dataset, &table, &ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_choice_parsing() {
        assert_eq!("CPU".parse::<DeviceChoice>(), Ok(DeviceChoice::Cpu));
        assert_eq!("wgpu".parse::<DeviceChoice>(), Ok(DeviceChoice::Gpu));
        assert!("tpu".parse::<DeviceChoice>().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let zero_batch = TrainConfig { batch_size: 0, ..TrainConfig::default() };
        assert!(zero_batch.validate().is_err());
        let bad_split = TrainConfig { train_fraction: 1.2, ..TrainConfig::default() };
        assert!(bad_split.validate().is_err());
    }

    #[test]
    fn test_split_is_reproducible() {
        let cfg = TrainConfig { num_abstracts: 20, ..TrainConfig::default() };
        let (a_train, a_val) = cfg.train_val_split().unwrap();
        let (b_train, b_val) = cfg.train_val_split().unwrap();
        assert_eq!(a_train, b_train);
        assert_eq!(a_val, b_val);
        assert_eq!(a_train.len() + a_val.len(), 20);
    }

    #[test]
    fn test_config_serialises_enums_lowercase() {
        let json = serde_json::to_string(&TrainConfig::default()).unwrap();
        assert!(json.contains("\"objective\":\"regression\""));
        assert!(json.contains("\"device\":\"cpu\""));

        let cfg  = TrainConfig { objective: Objective::LeftRight, ..TrainConfig::default() };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"objective\":\"left-right\""));
    }
}
