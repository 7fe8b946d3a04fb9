// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains the classifier, saves weights + stats
//   2. `evaluate` — reloads a trained model, re-runs evaluation
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

/// clap reads the fields and generates the argument parser
/// through the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "digit-trainer",
    version,
    about = "Train a small CNN digit classifier with burn and collect its mistakes."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training, output in: {}", args.output_dir);
    let output_dir = args.output_dir.clone();

    // CLI args → application config
    TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Results saved to '{output_dir}'.");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let stats = EvaluateUseCase::new(args.output_dir)
        .with_dataset(args.dataset)
        .with_batch_size(args.batch_size)
        .execute()?;

    println!(
        "Evaluation complete. {} misclassified samples saved to '{}'.",
        stats.misclassified().len(),
        stats.stats_path().display(),
    );
    Ok(())
}
