// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Re-opens a directory written by `train`:
//   1. train_config.json → architecture, backend, dataset, seed
//   2. model_final       → weights
// then runs one evaluation pass plus the misclassification
// harvest and writes eval_stats.json next to them.
//
// The dataset and batch size may be overridden; everything that
// shapes the model comes from the saved config.

use anyhow::Result;

use crate::application::train_use_case::{build_datasets, DatasetKind};
use crate::infra::{checkpoint::CheckpointManager, stats::ModelStats};
use crate::ml::runner::run_evaluation;

pub struct EvaluateUseCase {
    output_dir: String,
    dataset:    Option<DatasetKind>,
    batch_size: Option<usize>,
}

impl EvaluateUseCase {
    pub fn new(output_dir: String) -> Self {
        Self { output_dir, dataset: None, batch_size: None }
    }

    pub fn with_dataset(mut self, dataset: Option<DatasetKind>) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn execute(&self) -> Result<ModelStats> {
        let ckpt    = CheckpointManager::open(&self.output_dir)?;
        let mut cfg = ckpt.load_config()?;

        if let Some(dataset) = self.dataset {
            cfg.dataset = dataset;
        }
        if let Some(batch_size) = self.batch_size {
            cfg.batch_size = batch_size;
        }
        cfg.validate()?;

        tracing::info!("Evaluating '{}' on {:?}", self.output_dir, cfg.dataset);
        let (_, test_dataset) = build_datasets(&cfg);
        run_evaluation(&cfg, test_dataset, &ckpt)
    }
}
