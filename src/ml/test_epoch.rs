// ============================================================
// Layer 5 — Evaluation Pass
// ============================================================
// One pass over the evaluation loader with the model's eval form
// (`model.valid()`, inner backend → no autodiff graph, dropout off).
// Per batch the SUMMED NLL and the correct count are recorded.
//
// After the pass, a plateau schedule is stepped exactly once. The
// metric it sees depends on the variant's PlateauMetric:
//   LastBatchLoss → summed loss of the final batch
//   EpochLoss     → summed loss of the pass / sample count

use burn::prelude::*;

use crate::data::ImageLoader;
use crate::domain::epoch::RunningTotals;
use crate::infra::stats::ModelStats;
use crate::ml::{
    loss::{correct_count, nll_loss, NllReduction},
    model::ImageClassifier,
    scheduler::{LrSchedule, PlateauMetric},
};

pub struct TestEpoch<B: Backend> {
    loader: ImageLoader<B>,
    device: B::Device,
}

impl<B: Backend> TestEpoch<B> {
    pub fn new(loader: ImageLoader<B>, device: B::Device) -> Self {
        Self { loader, device }
    }

    /// Returns the new learning rate when a plateau schedule was stepped.
    pub fn run<M>(
        &self,
        model:    &M,
        schedule: &mut LrSchedule,
        stats:    &mut ModelStats,
    ) -> Option<f64>
    where
        M: ImageClassifier<B>,
    {
        let mut totals    = RunningTotals::default();
        let mut last_loss = None;

        for batch in self.loader.iter() {
            let batch      = batch.to_device(&self.device);
            let batch_size = batch.len();

            let log_probs = model.forward(batch.images);
            let loss = nll_loss(log_probs.clone(), batch.targets.clone(), NllReduction::Sum)
                .into_scalar()
                .elem::<f64>();
            let correct = correct_count(log_probs, batch.targets);

            stats.add_batch_test_stats(loss, correct, batch_size);
            totals.add(loss, correct, batch_size);
            last_loss = Some(loss);
        }

        tracing::debug!(
            "Evaluation pass: {} batches, {} samples, {} correct",
            totals.batches,
            totals.samples,
            totals.correct,
        );

        // An empty pass has no loss to report, so the plateau is left as is
        let metric = match schedule.plateau_metric()? {
            PlateauMetric::LastBatchLoss => last_loss?,
            PlateauMetric::EpochLoss if totals.samples > 0 => totals.loss_per_sample(),
            PlateauMetric::EpochLoss => return None,
        };
        schedule.step_plateau(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::synthetic_digits;
    use crate::ml::model::{DigitNet, DigitNetConfig};
    use crate::ml::scheduler::{ReduceLrOnPlateau, StepLr};
    use crate::ml::test_support::{image_loader, loader_from_items, EvalBackend};

    fn stats() -> ModelStats {
        ModelStats::new(std::env::temp_dir().join("digit-trainer-unused"))
    }

    fn model() -> DigitNet<EvalBackend> {
        DigitNetConfig::new().init(&Default::default())
    }

    #[test]
    fn test_accumulates_summed_loss_per_batch() {
        let mut stats = stats();
        let epoch = TestEpoch::new(image_loader::<EvalBackend>(10, 4), Default::default());

        let lr = epoch.run(&model(), &mut LrSchedule::None, &mut stats);
        assert!(lr.is_none());

        let totals = stats.test_totals();
        assert_eq!(totals.batches, 3);
        assert_eq!(totals.samples, 10);
        assert!(totals.correct <= 10);
        // Summed NLL of an untrained 10-class model is around 10 · ln(10)
        assert!(totals.loss > 5.0);
    }

    #[test]
    fn test_plateau_stepped_once_with_last_batch_loss() {
        let model = model();
        let items = synthetic_digits(10, 5);

        // The same final batch on its own gives the expected metric
        let mut reference = stats();
        TestEpoch::new(loader_from_items::<EvalBackend>(items[8..].to_vec(), 4), Default::default())
            .run(&model, &mut LrSchedule::None, &mut reference);
        let last_batch_loss = reference.test_totals().loss;

        // patience 0 + factor 0.5: first step sets `best`, so the lr stays
        let mut schedule = LrSchedule::plateau(
            ReduceLrOnPlateau::new(0.1).with_patience(0).with_factor(0.5),
            PlateauMetric::LastBatchLoss,
        );
        let epoch = TestEpoch::new(loader_from_items::<EvalBackend>(items, 4), Default::default());
        let mut stats = stats();

        assert_eq!(epoch.run(&model, &mut schedule, &mut stats), Some(0.1));
        match &schedule {
            LrSchedule::Plateau { scheduler, .. } => {
                assert_eq!(scheduler.steps(), 1);
                assert!((scheduler.best() - last_batch_loss).abs() < 1e-6 * last_batch_loss);
            }
            other => panic!("unexpected schedule {other:?}"),
        }

        // Feeding the same metric again is not an improvement → reduce
        assert_eq!(schedule.step_plateau(last_batch_loss), Some(0.05));
    }

    #[test]
    fn test_epoch_loss_metric_uses_whole_pass() {
        let mut schedule = LrSchedule::plateau(ReduceLrOnPlateau::new(0.1), PlateauMetric::EpochLoss);
        let epoch = TestEpoch::new(image_loader::<EvalBackend>(6, 4), Default::default());
        let mut stats = stats();

        assert!(epoch.run(&model(), &mut schedule, &mut stats).is_some());
        let totals = stats.test_totals();
        assert_eq!(totals.batches, 2);
        assert_eq!(totals.samples, 6);
        match &schedule {
            LrSchedule::Plateau { scheduler, .. } => {
                assert_eq!(scheduler.steps(), 1);
                assert!((scheduler.best() - totals.loss / 6.0).abs() < 1e-9);
            }
            other => panic!("unexpected schedule {other:?}"),
        }
    }

    #[test]
    fn test_non_plateau_schedules_are_not_stepped() {
        let mut schedule = LrSchedule::per_epoch(StepLr::new(0.1, 1, 0.5));
        let epoch = TestEpoch::new(image_loader::<EvalBackend>(4, 4), Default::default());

        assert!(epoch.run(&model(), &mut schedule, &mut stats()).is_none());
        assert_eq!(schedule.current_lr(), Some(0.1));
    }

    #[test]
    fn test_empty_loader_skips_plateau_step() {
        let mut schedule = LrSchedule::plateau(ReduceLrOnPlateau::new(0.1), PlateauMetric::LastBatchLoss);
        let epoch = TestEpoch::new(loader_from_items::<EvalBackend>(Vec::new(), 4), Default::default());

        assert!(epoch.run(&model(), &mut schedule, &mut stats()).is_none());
        match &schedule {
            LrSchedule::Plateau { scheduler, .. } => assert_eq!(scheduler.steps(), 0),
            other => panic!("unexpected schedule {other:?}"),
        }
        assert_eq!(schedule.current_lr(), Some(0.1));
    }
}
