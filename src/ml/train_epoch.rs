// ============================================================
// Layer 5 — Training Pass
// ============================================================
// One pass over the training loader on the autodiff backend.
// Per batch:
//
//   1. move images/targets to the trainer's device
//   2. forward → log-probabilities
//   3. mean NLL (+ λ·Σ|θ| when L1 is enabled)
//   4. backward → fresh GradientsParams → optimizer step
//   5. record loss / correct / batch size / lr in ModelStats
//   6. step the schedule if it is batch-stepped
//
// burn hands out a new gradient container on every backward(),
// so there is nothing to zero between batches.

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::data::ImageLoader;
use crate::infra::stats::ModelStats;
use crate::ml::{
    loss::{correct_count, training_loss},
    model::ImageClassifier,
    optimizer::TrainingOptimizer,
    scheduler::LrSchedule,
};

pub struct TrainEpoch<B: AutodiffBackend> {
    loader:        ImageLoader<B>,
    device:        B::Device,
    l1_lambda:     f64,
    show_progress: bool,
}

impl<B: AutodiffBackend> TrainEpoch<B> {
    pub fn new(loader: ImageLoader<B>, device: B::Device) -> Self {
        Self { loader, device, l1_lambda: 0.0, show_progress: false }
    }

    pub fn with_l1_lambda(mut self, l1_lambda: f64) -> Self {
        self.l1_lambda = l1_lambda;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn l1_lambda(&self) -> f64 {
        self.l1_lambda
    }

    /// Run one training pass and hand the updated model back.
    pub fn run<M, O>(
        &self,
        mut model: M,
        optimizer: &mut TrainingOptimizer<O>,
        schedule:  &mut LrSchedule,
        stats:     &mut ModelStats,
    ) -> M
    where
        M: AutodiffModule<B> + ImageClassifier<B>,
        O: Optimizer<M, B>,
    {
        let progress = progress_bar(self.loader.num_items(), self.show_progress);

        for batch in self.loader.iter() {
            let batch      = batch.to_device(&self.device);
            let batch_size = batch.len();

            let log_probs = model.forward(batch.images);
            let correct   = correct_count(log_probs.clone(), batch.targets.clone());
            let loss      = training_loss(&model, log_probs, batch.targets, self.l1_lambda);
            let loss_val  = loss.clone().into_scalar().elem::<f64>();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step::<B, M>(model, grads);

            // Display-only: the scheduled rate when batches are scheduled
            let lr = schedule
                .batch_lr()
                .unwrap_or_else(|| optimizer.learning_rate());
            stats.add_batch_train_stats(loss_val, correct, batch_size, lr);
            progress.set_message(stats.latest_batch_description());
            progress.inc(batch_size as u64);

            if let Some(next_lr) = schedule.step_batch() {
                optimizer.set_learning_rate(next_lr);
            }
        }

        progress.finish_and_clear();
        model
    }
}

/// A bar over `len` samples, or a hidden one when progress is off
pub(crate) fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>7}/{len:7} {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
