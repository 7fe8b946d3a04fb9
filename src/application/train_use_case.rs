// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a full training run in order:
//
//   Step 1: Validate the configuration      (this layer)
//   Step 2: Build train/test datasets       (Layer 4 - data)
//   Step 3: Save config for `evaluate`      (Layer 6 - infra)
//   Step 4: Train, harvest, persist stats   (Layer 5 - ml)
//   Step 5: Save the final weights          (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::data::{
    dataset::{synthetic_digits, ImageDataset},
    splitter::split_train_test,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{runner::run_training, scheduler::PlateauMetric};

// ─── Option Enums ─────────────────────────────────────────────────────────────
// Parsed from CLI strings via FromStr so clap never leaks past Layer 1,
// and stored in train_config.json via serde.

/// Where training and evaluation images come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    /// MNIST through burn's vision dataset (downloaded on first use)
    Mnist,
    /// Seeded, generated stripe digits split 80/20
    Synthetic,
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mnist"     => Ok(Self::Mnist),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(format!("unknown dataset '{other}' (expected mnist or synthetic)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[serde(rename = "ndarray")]
    NdArray,
    Wgpu,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ndarray" | "cpu" => Ok(Self::NdArray),
            "wgpu" | "gpu"    => Ok(Self::Wgpu),
            other => Err(format!("unknown backend '{other}' (expected ndarray or wgpu)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizerKind {
    /// SGD with classical momentum (none when momentum = 0)
    Sgd,
    Adam,
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sgd"  => Ok(Self::Sgd),
            "adam" => Ok(Self::Adam),
            other => Err(format!("unknown optimizer '{other}' (expected sgd or adam)")),
        }
    }
}

/// Which learning-rate schedule drives the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    /// Constant learning rate
    None,
    /// StepLr, stepped once per epoch
    Step,
    /// OneCycleLr, stepped after every training batch
    OneCycle,
    /// ReduceLrOnPlateau, stepped once per evaluation pass
    Plateau,
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none"      => Ok(Self::None),
            "step"      => Ok(Self::Step),
            "one-cycle" => Ok(Self::OneCycle),
            "plateau"   => Ok(Self::Plateau),
            other => Err(format!(
                "unknown scheduler '{other}' (expected none, step, one-cycle or plateau)"
            )),
        }
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Saved next to the weights
// so `evaluate` can rebuild the same model and the same test split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset:           DatasetKind,
    pub backend:           BackendKind,
    pub output_dir:        String,
    pub epochs:            usize,
    pub batch_size:        usize,
    pub lr:                f64,
    pub optimizer:         OptimizerKind,
    pub momentum:          f64,
    pub l1_lambda:         f64,
    pub dropout:           f64,
    pub scheduler:         SchedulerKind,
    pub step_size:         usize,
    pub gamma:             f64,
    pub max_lr:            f64,
    pub plateau_factor:    f64,
    pub plateau_patience:  usize,
    pub plateau_metric:    PlateauMetric,
    pub num_workers:       usize,
    pub seed:              u64,
    pub synthetic_samples: usize,
    pub train_fraction:    f64,
    #[serde(default)]
    pub show_progress:     bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset:           DatasetKind::Mnist,
            backend:           BackendKind::NdArray,
            output_dir:        "output".to_string(),
            epochs:            15,
            batch_size:        64,
            lr:                0.01,
            optimizer:         OptimizerKind::Sgd,
            momentum:          0.9,
            l1_lambda:         0.0,
            dropout:           0.1,
            scheduler:         SchedulerKind::None,
            step_size:         6,
            gamma:             0.1,
            max_lr:            0.1,
            plateau_factor:    0.1,
            plateau_patience:  2,
            plateau_metric:    PlateauMetric::LastBatchLoss,
            num_workers:       1,
            seed:              42,
            synthetic_samples: 2000,
            train_fraction:    0.8,
            show_progress:     true,
        }
    }
}

impl TrainConfig {
    /// Reject values that would make the run meaningless before any
    /// data is loaded. Zero epochs is allowed (evaluation + harvest only).
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch size must be greater than 0");
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            bail!("learning rate must be a positive number, got {}", self.lr);
        }
        if !(0.0..1.0).contains(&self.momentum) {
            bail!("momentum must be in [0, 1), got {}", self.momentum);
        }
        if !(self.l1_lambda >= 0.0 && self.l1_lambda.is_finite()) {
            bail!("L1 coefficient must be >= 0, got {}", self.l1_lambda);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }

        match self.scheduler {
            SchedulerKind::None => {}
            SchedulerKind::Step => {
                if self.step_size == 0 {
                    bail!("step size must be greater than 0");
                }
                if self.gamma <= 0.0 {
                    bail!("gamma must be positive, got {}", self.gamma);
                }
            }
            SchedulerKind::OneCycle => {
                if self.max_lr <= 0.0 {
                    bail!("max lr must be positive, got {}", self.max_lr);
                }
            }
            SchedulerKind::Plateau => {
                if !(self.plateau_factor > 0.0 && self.plateau_factor < 1.0) {
                    bail!("plateau factor must be in (0, 1), got {}", self.plateau_factor);
                }
            }
        }

        if self.dataset == DatasetKind::Synthetic {
            if self.synthetic_samples == 0 {
                bail!("synthetic sample count must be greater than 0");
            }
            if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
                bail!("train fraction must be in (0, 1), got {}", self.train_fraction);
            }
        }
        Ok(())
    }
}

/// Train and test datasets for `cfg`. The synthetic pool is regenerated
/// from the seed, so `evaluate` sees the same test split as `train`.
pub(crate) fn build_datasets(cfg: &TrainConfig) -> (ImageDataset, ImageDataset) {
    match cfg.dataset {
        DatasetKind::Mnist => (ImageDataset::mnist_train(), ImageDataset::mnist_test()),
        DatasetKind::Synthetic => {
            let pool = synthetic_digits(cfg.synthetic_samples, cfg.seed);
            let (train, test) = split_train_test(pool, cfg.train_fraction, cfg.seed);
            (ImageDataset::in_memory(train), ImageDataset::in_memory(test))
        }
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

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Datasets ──────────────────────────────────────────────────
        tracing::info!("Loading {:?} dataset", cfg.dataset);
        let (train_dataset, test_dataset) = build_datasets(cfg);
        tracing::info!(
            "Split: {} train, {} test",
            train_dataset.sample_count(),
            test_dataset.sample_count(),
        );

        // ── Step 3: Save config for evaluation ────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.output_dir)?;
        ckpt.save_config(cfg)?;

        // ── Steps 4-5: Train (Layer 5) ────────────────────────────────────────
        let stats = run_training(cfg, train_dataset, test_dataset, &ckpt)?;

        tracing::info!(
            "Finished {} epochs, {} misclassified samples stored",
            stats.epochs().len(),
            stats.misclassified().len(),
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { lr: 0.0, ..TrainConfig::default() },
            TrainConfig { lr: f64::NAN, ..TrainConfig::default() },
            TrainConfig { momentum: 1.0, ..TrainConfig::default() },
            TrainConfig { l1_lambda: -1e-3, ..TrainConfig::default() },
            TrainConfig { dropout: 1.0, ..TrainConfig::default() },
            TrainConfig { scheduler: SchedulerKind::Step, step_size: 0, ..TrainConfig::default() },
            TrainConfig { scheduler: SchedulerKind::OneCycle, max_lr: 0.0, ..TrainConfig::default() },
            TrainConfig { scheduler: SchedulerKind::Plateau, plateau_factor: 1.5, ..TrainConfig::default() },
            TrainConfig {
                dataset: DatasetKind::Synthetic,
                synthetic_samples: 0,
                ..TrainConfig::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "accepted {cfg:?}");
        }
    }

    #[test]
    fn test_zero_epochs_is_valid() {
        assert!(TrainConfig { epochs: 0, ..TrainConfig::default() }.validate().is_ok());
    }

    #[test]
    fn test_option_enums_parse() {
        assert_eq!("synthetic".parse::<DatasetKind>(), Ok(DatasetKind::Synthetic));
        assert_eq!("cpu".parse::<BackendKind>(), Ok(BackendKind::NdArray));
        assert_eq!("adam".parse::<OptimizerKind>(), Ok(OptimizerKind::Adam));
        assert_eq!("one-cycle".parse::<SchedulerKind>(), Ok(SchedulerKind::OneCycle));
        assert!("cosine".parse::<SchedulerKind>().is_err());
    }

    #[test]
    fn test_config_json_uses_kebab_case_enums() {
        let cfg  = TrainConfig { scheduler: SchedulerKind::OneCycle, ..TrainConfig::default() };
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["scheduler"], "one-cycle");
        assert_eq!(json["plateau_metric"], "last-batch-loss");
        assert_eq!(json["backend"], "ndarray");
    }

    #[test]
    fn test_synthetic_split_is_reproducible() {
        let cfg = TrainConfig {
            dataset:           DatasetKind::Synthetic,
            synthetic_samples: 50,
            ..TrainConfig::default()
        };
        let (train_a, test_a) = build_datasets(&cfg);
        let (_, test_b)       = build_datasets(&cfg);
        assert_eq!(train_a.sample_count(), 40);
        assert_eq!(test_a.sample_count(), 10);

        use burn::data::dataset::Dataset;
        assert_eq!(test_a.get(0), test_b.get(0));
    }

    #[test]
    fn test_execute_rejects_invalid_config_before_writing() {
        let dir = std::env::temp_dir().join(format!("digit-trainer-invalid-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let cfg = TrainConfig {
            batch_size: 0,
            output_dir: dir.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
        assert!(!dir.exists());
    }
}
