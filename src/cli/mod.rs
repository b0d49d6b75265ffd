// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All workflow logic is delegated to Layer 2 (application).
//
//   1. `train` — generates a corpus and trains a model
//   2. `order` — loads a checkpoint and reorders held-out
//                abstracts, printing gold vs. predicted
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, OrderArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "sentence-order",
    version = "0.1.0",
    about = "Train a sentence-ordering model, then reorder shuffled abstracts."
)]
pub struct Cli {
    /// The subcommand to run (train or order)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => Self::run_train(args),
            Commands::Order(args) => Self::run_order(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        let summaries = TrainUseCase::new(args.into()).execute()?;
        match summaries.last() {
            Some(last) => println!(
                "Training complete after {} epochs (train_loss={:.4}, val_loss={:.4}).",
                last.epoch, last.train_loss, last.val_loss
            ),
            None => println!("No epochs run."),
        }
        Ok(())
    }

    fn run_order(args: OrderArgs) -> Result<()> {
        use crate::application::order_use_case::OrderUseCase;

        let use_case = OrderUseCase::new(args.checkpoint_dir, args.device, args.count)?;
        let reports  = use_case.execute()?;

        let exact = reports.iter().filter(|r| r.is_exact()).count();
        for (i, report) in reports.iter().enumerate() {
            println!(
                "\nAbstract {} ({} sentences){}",
                i + 1,
                report.shuffled.len(),
                if report.is_exact() { "  ✓" } else { "" }
            );
            println!("  gold      : {:?}", report.gold);
            println!("  predicted : {:?}", report.predicted);
            println!("  positions : {:?}", report.predicted_positions()?);
        }
        println!("\n{exact}/{} abstracts ordered exactly.", reports.len());
        Ok(())
    }
}
