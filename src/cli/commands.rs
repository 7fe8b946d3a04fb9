// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, and the option enums
//     through their FromStr impls)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::train_use_case::{
    BackendKind, DatasetKind, OptimizerKind, SchedulerKind, TrainConfig,
};
use crate::ml::scheduler::PlateauMetric;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the digit classifier and save weights + statistics
    Train(TrainArgs),

    /// Evaluate a trained model and collect misclassified samples
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Image source: mnist | synthetic
    #[arg(long, default_value = "mnist")]
    pub dataset: DatasetKind,

    /// Tensor backend: ndarray (CPU) | wgpu (GPU)
    #[arg(long, default_value = "ndarray")]
    pub backend: BackendKind,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 15)]
    pub epochs: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Initial learning rate
    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    /// Optimizer: sgd | adam
    #[arg(long, default_value = "sgd")]
    pub optimizer: OptimizerKind,

    /// SGD momentum (0 disables it)
    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// L1 coefficient added as λ·Σ|θ| to the training loss
    #[arg(long, default_value_t = 0.0)]
    pub l1_lambda: f64,

    /// Dropout probability before the final layer
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Learning-rate schedule: none | step | one-cycle | plateau
    #[arg(long, default_value = "none")]
    pub scheduler: SchedulerKind,

    /// Epochs between StepLr decays
    #[arg(long, default_value_t = 6)]
    pub step_size: usize,

    /// StepLr decay factor
    #[arg(long, default_value_t = 0.1)]
    pub gamma: f64,

    /// Peak rate of the one-cycle schedule
    #[arg(long, default_value_t = 0.1)]
    pub max_lr: f64,

    /// Factor applied when the plateau scheduler reduces the rate
    #[arg(long, default_value_t = 0.1)]
    pub plateau_factor: f64,

    /// Evaluation passes without improvement before reducing
    #[arg(long, default_value_t = 2)]
    pub plateau_patience: usize,

    /// Loss watched by the plateau scheduler: last-batch | epoch
    #[arg(long, default_value = "last-batch")]
    pub plateau_metric: PlateauMetric,

    /// Data loader worker threads (0 = load on the training thread)
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for shuffling and the synthetic dataset
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Size of the generated pool when --dataset synthetic
    #[arg(long, default_value_t = 2000)]
    pub synthetic_samples: usize,

    /// Directory for config, weights and statistics
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// Hide the per-batch progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset:           a.dataset,
            backend:           a.backend,
            output_dir:        a.output_dir,
            epochs:            a.epochs,
            batch_size:        a.batch_size,
            lr:                a.lr,
            optimizer:         a.optimizer,
            momentum:          a.momentum,
            l1_lambda:         a.l1_lambda,
            dropout:           a.dropout,
            scheduler:         a.scheduler,
            step_size:         a.step_size,
            gamma:             a.gamma,
            max_lr:            a.max_lr,
            plateau_factor:    a.plateau_factor,
            plateau_patience:  a.plateau_patience,
            plateau_metric:    a.plateau_metric,
            num_workers:       a.num_workers,
            seed:              a.seed,
            synthetic_samples: a.synthetic_samples,
            show_progress:     !a.no_progress,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by a previous `train` run
    #[arg(long, default_value = "output")]
    pub output_dir: String,

    /// Override the dataset stored in train_config.json
    #[arg(long)]
    pub dataset: Option<DatasetKind>,

    /// Override the batch size stored in train_config.json
    #[arg(long)]
    pub batch_size: Option<usize>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Commands {
        let mut argv = vec!["digit-trainer"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let Commands::Train(args) = parse(&["train"]) else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();

        assert_eq!(cfg.dataset, def.dataset);
        assert_eq!(cfg.epochs, def.epochs);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.lr, def.lr);
        assert_eq!(cfg.scheduler, def.scheduler);
        assert_eq!(cfg.plateau_metric, def.plateau_metric);
        assert!(cfg.show_progress);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_train_flags_reach_config() {
        let Commands::Train(args) = parse(&[
            "train",
            "--dataset", "synthetic",
            "--scheduler", "plateau",
            "--plateau-metric", "epoch",
            "--optimizer", "adam",
            "--l1-lambda", "0.0001",
            "--epochs", "3",
            "--no-progress",
        ]) else {
            panic!("expected train");
        };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.dataset, DatasetKind::Synthetic);
        assert_eq!(cfg.scheduler, SchedulerKind::Plateau);
        assert_eq!(cfg.plateau_metric, PlateauMetric::EpochLoss);
        assert_eq!(cfg.optimizer, OptimizerKind::Adam);
        assert_eq!(cfg.l1_lambda, 0.0001);
        assert_eq!(cfg.epochs, 3);
        assert!(!cfg.show_progress);
    }

    #[test]
    fn test_unknown_scheduler_is_a_parse_error() {
        let result = Cli::try_parse_from(["digit-trainer", "train", "--scheduler", "cosine"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluate_overrides_are_optional() {
        let Commands::Evaluate(args) = parse(&["evaluate"]) else {
            panic!("expected evaluate");
        };
        assert_eq!(args.output_dir, "output");
        assert!(args.dataset.is_none());
        assert!(args.batch_size.is_none());

        let Commands::Evaluate(args) = parse(&["evaluate", "--dataset", "synthetic", "--batch-size", "8"]) else {
            panic!("expected evaluate");
        };
        assert_eq!(args.dataset, Some(DatasetKind::Synthetic));
        assert_eq!(args.batch_size, Some(8));
    }
}
