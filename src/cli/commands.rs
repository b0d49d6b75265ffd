// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `order`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{DeviceChoice, TrainConfig};
use crate::ml::model::Objective;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a sentence-ordering model on a synthetic corpus
    Train(TrainArgs),

    /// Reorder shuffled held-out abstracts with a trained checkpoint
    Order(OrderArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory to save model checkpoints and the training config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Training signal: pairwise | regression | left-right | shuffle
    #[arg(long, default_value = "regression")]
    pub objective: Objective,

    /// cpu (NdArray) or gpu (Wgpu)
    #[arg(long, default_value = "cpu")]
    pub device: DeviceChoice,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Random batches drawn per epoch
    #[arg(long, default_value_t = 100)]
    pub epoch_size: usize,

    /// Abstracts per batch
    #[arg(long, default_value_t = 10)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Hidden size of each LSTM direction
    #[arg(long, default_value_t = 64)]
    pub lstm_dim: usize,

    /// Hidden size of the linear heads
    #[arg(long, default_value_t = 64)]
    pub lin_dim: usize,

    /// Tokens kept per sentence; longer sentences are truncated
    #[arg(long, default_value_t = 50)]
    pub max_tokens: usize,

    /// Abstracts with this many sentences or more are skipped
    #[arg(long, default_value_t = 10)]
    pub max_sentences: usize,

    /// Size of the generated corpus
    #[arg(long, default_value_t = 2000)]
    pub num_abstracts: usize,

    #[arg(long, default_value_t = 500)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 32)]
    pub embedding_dim: usize,

    /// Seeds the corpus, the embedding table, the split and training
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            checkpoint_dir: a.checkpoint_dir,
            objective:      a.objective,
            device:         a.device,
            epochs:         a.epochs,
            epoch_size:     a.epoch_size,
            batch_size:     a.batch_size,
            lr:             a.lr,
            lstm_dim:       a.lstm_dim,
            lin_dim:        a.lin_dim,
            max_tokens:     a.max_tokens,
            max_sentences:  a.max_sentences,
            num_abstracts:  a.num_abstracts,
            vocab_size:     a.vocab_size,
            embedding_dim:  a.embedding_dim,
            seed:           a.seed,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `order` command
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the device recorded at training time
    #[arg(long)]
    pub device: Option<DeviceChoice>,

    /// How many held-out abstracts to reorder
    #[arg(long, default_value_t = 5)]
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_become_config() {
        let cli = Cli::try_parse_from([
            "sentence-order", "train", "--objective", "pairwise", "--epochs", "3", "--seed", "9",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.objective, Objective::Pairwise);
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.device, DeviceChoice::Cpu);
    }

    #[test]
    fn test_window_and_shuffle_objectives_parse() {
        for (flag, objective) in [("left-right", Objective::LeftRight), ("shuffle", Objective::Shuffle)] {
            let cli = Cli::try_parse_from(["sentence-order", "train", "--objective", flag]).unwrap();
            let Commands::Train(args) = cli.command else { panic!("expected train") };
            assert_eq!(args.objective, objective);
        }
    }

    #[test]
    fn test_unknown_objective_is_rejected() {
        assert!(Cli::try_parse_from(["sentence-order", "train", "--objective", "ranking"]).is_err());
    }

    #[test]
    fn test_order_device_is_optional() {
        let cli = Cli::try_parse_from(["sentence-order", "order", "--count", "2"]).unwrap();
        let Commands::Order(args) = cli.command else { panic!("expected order") };
        assert_eq!(args.device, None);
        assert_eq!(args.count, 2);
    }
}
