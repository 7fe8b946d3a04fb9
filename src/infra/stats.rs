// ============================================================
// Layer 6 — Model Statistics Recorder
// ============================================================
// One ModelStats instance is owned by the coordinator and lent
// (&mut) to each epoch runner in turn:
//
//   TrainEpoch                 → add_batch_train_stats per batch
//   TestEpoch                  → add_batch_test_stats per batch
//   ModelTrainer               → next_epoch at each epoch boundary
//   MisclassificationCollector → misclassified_mut().push(..)
//
// `save()` writes a JSON snapshot (epochs, batch history and the
// misclassified samples) plus any CSV rows not yet logged.

use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{
    epoch::{BatchStats, EpochSummary, RunningTotals},
    misclassified::MisclassifiedSet,
};
use crate::infra::metrics::MetricsLogger;

pub const DEFAULT_STATS_FILE: &str = "stats.json";

#[derive(Serialize)]
struct StatsSnapshot<'a> {
    epochs:        &'a [EpochSummary],
    train_batches: &'a [BatchStats],
    test:          &'a RunningTotals,
    misclassified: &'a MisclassifiedSet,
}

#[derive(Debug)]
pub struct ModelStats {
    dir:           PathBuf,
    file_name:     String,
    train:         RunningTotals,
    test:          RunningTotals,
    train_batches: Vec<BatchStats>,
    epochs:        Vec<EpochSummary>,
    logged_epochs: usize,
    misclassified: MisclassifiedSet,
}

impl ModelStats {
    /// Statistics persisted under `dir` once `save()` is called
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir:           dir.into(),
            file_name:     DEFAULT_STATS_FILE.to_string(),
            train:         RunningTotals::default(),
            test:          RunningTotals::default(),
            train_batches: Vec::new(),
            epochs:        Vec::new(),
            logged_epochs: 0,
            misclassified: MisclassifiedSet::default(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    // ── Per-batch recording ──────────────────────────────────────────────────

    /// `loss` is the batch's mean loss; `learning_rate` is display-only.
    pub fn add_batch_train_stats(
        &mut self,
        loss:          f64,
        correct:       usize,
        batch_size:    usize,
        learning_rate: f64,
    ) {
        self.train.add(loss, correct, batch_size);
        self.train_batches.push(BatchStats {
            loss,
            correct,
            samples: batch_size,
            learning_rate,
        });
    }

    /// `loss` is the batch's summed loss.
    pub fn add_batch_test_stats(&mut self, loss: f64, correct: usize, batch_size: usize) {
        self.test.add(loss, correct, batch_size);
    }

    // ── Epoch boundary ───────────────────────────────────────────────────────

    /// Finalise the running totals into an EpochSummary and reset them.
    pub fn next_epoch(&mut self, learning_rate: f64) -> &EpochSummary {
        let epoch   = self.epochs.len() + 1;
        let summary = EpochSummary::from_totals(epoch, learning_rate, &self.train, &self.test);
        self.train = RunningTotals::default();
        self.test  = RunningTotals::default();
        self.epochs.push(summary);
        &self.epochs[epoch - 1]
    }

    // ── Descriptions for the console ─────────────────────────────────────────

    pub fn latest_batch_description(&self) -> String {
        match self.train_batches.last() {
            Some(b) => format!(
                "Batch={} Loss={:.4} Acc={:.2}% LR={:.6}",
                self.train.batches,
                b.loss,
                b.accuracy() * 100.0,
                b.learning_rate,
            ),
            None => "Batch=0".to_string(),
        }
    }

    pub fn epoch_description(&self) -> String {
        match self.epochs.last() {
            Some(e) => format!(
                "Epoch: {}, Train set: Average loss: {:.4}, Accuracy: {:.2}%; \
                 Test set: Average loss: {:.4}, Accuracy: {:.2}%",
                e.epoch,
                e.train_loss,
                e.train_accuracy * 100.0,
                e.test_loss,
                e.test_accuracy * 100.0,
            ),
            None => "Epoch: 0".to_string(),
        }
    }

    /// Summary of the evaluation totals accumulated since the last boundary
    pub fn evaluation_description(&self) -> String {
        format!(
            "Test set: Average loss: {:.4}, Accuracy: {}/{} ({:.2}%)",
            self.test.loss_per_sample(),
            self.test.correct,
            self.test.samples,
            self.test.accuracy() * 100.0,
        )
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn epochs(&self) -> &[EpochSummary] {
        &self.epochs
    }

    pub fn train_batches(&self) -> &[BatchStats] {
        &self.train_batches
    }

    pub fn train_totals(&self) -> &RunningTotals {
        &self.train
    }

    pub fn test_totals(&self) -> &RunningTotals {
        &self.test
    }

    pub fn misclassified(&self) -> &MisclassifiedSet {
        &self.misclassified
    }

    pub fn misclassified_mut(&mut self) -> &mut MisclassifiedSet {
        &mut self.misclassified
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats_path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Write the JSON snapshot and append unlogged epoch rows to metrics.csv
    pub fn save(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create stats dir '{}'", self.dir.display()))?;

        let snapshot = StatsSnapshot {
            epochs:        &self.epochs,
            train_batches: &self.train_batches,
            test:          &self.test,
            misclassified: &self.misclassified,
        };
        let path = self.stats_path();
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write stats to '{}'", path.display()))?;

        if self.logged_epochs < self.epochs.len() {
            let logger = MetricsLogger::new(&self.dir)?;
            for summary in &self.epochs[self.logged_epochs..] {
                logger.log(summary)?;
            }
            self.logged_epochs = self.epochs.len();
        }

        tracing::info!(
            "Saved stats ({} epochs, {} misclassified) to '{}'",
            self.epochs.len(),
            self.misclassified.len(),
            path.display(),
        );
        Ok(())
    }
}
