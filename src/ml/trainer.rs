// ============================================================
// Layer 5 — Training Coordinator
// ============================================================
// ModelTrainer owns everything a run mutates: model, optimizer,
// schedule and the statistics recorder. Per epoch:
//
//   Training(i)   → TrainEpoch on the autodiff backend
//   Evaluating(i) → TestEpoch on model.valid() (inner backend)
//                   plateau schedule stepped here, lr copied back
//   boundary      → stats.next_epoch(lr), print summary,
//                   step an epoch-level schedule once
//
// After the last epoch:
//
//   Finalizing    → MisclassificationCollector once, stats.save()
//
// burn's optimizer takes the module by value and hands back the
// updated one, so `run` consumes the trainer and returns the
// trained model inside TrainingRun.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;

use crate::data::ImageLoader;
use crate::infra::stats::ModelStats;
use crate::ml::{
    misclass::MisclassificationCollector,
    model::ImageClassifier,
    optimizer::TrainingOptimizer,
    scheduler::LrSchedule,
    test_epoch::TestEpoch,
    train_epoch::TrainEpoch,
};

/// Where the coordinator currently is. Transitions are strictly
/// sequential: Idle → (Training(i) → Evaluating(i))* → Finalizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrainerPhase {
    Idle,
    Training(usize),
    Evaluating(usize),
    Finalizing,
}

/// What a finished run hands back
#[derive(Debug)]
pub struct TrainingRun<M> {
    pub model:    M,
    pub stats:    ModelStats,
    pub schedule: LrSchedule,
    pub phases:   Vec<TrainerPhase>,
}

pub struct ModelTrainer<B: AutodiffBackend, M, O> {
    model:     M,
    optimizer: TrainingOptimizer<O>,
    schedule:  LrSchedule,
    stats:     ModelStats,
    train:     TrainEpoch<B>,
    test:      TestEpoch<B::InnerBackend>,
    misclass:  MisclassificationCollector<B::InnerBackend>,
    phases:    Vec<TrainerPhase>,
}

impl<B, M, O> ModelTrainer<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + ImageClassifier<B>,
    M::InnerModule: ImageClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    pub fn new(
        model:        M,
        optimizer:    TrainingOptimizer<O>,
        stats:        ModelStats,
        train_loader: ImageLoader<B>,
        test_loader:  ImageLoader<B::InnerBackend>,
        device:       B::Device,
    ) -> Self {
        Self {
            model,
            optimizer,
            schedule: LrSchedule::None,
            stats,
            train:    TrainEpoch::new(train_loader, device.clone()),
            test:     TestEpoch::new(test_loader.clone(), device.clone()),
            misclass: MisclassificationCollector::new(test_loader, device),
            phases:   vec![TrainerPhase::Idle],
        }
    }

    /// Install the schedule and start the optimizer at its rate
    pub fn with_schedule(mut self, schedule: LrSchedule) -> Self {
        if let Some(lr) = schedule.current_lr() {
            self.optimizer.set_learning_rate(lr);
        }
        tracing::debug!("Schedule: {} (lr={:.6})", schedule.kind(), self.optimizer.learning_rate());
        self.schedule = schedule;
        self
    }

    pub fn with_l1_lambda(mut self, l1_lambda: f64) -> Self {
        self.train = self.train.with_l1_lambda(l1_lambda);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.train = self.train.with_progress(show_progress);
        self
    }

    /// Train for `epochs` epochs, harvest misclassified samples once,
    /// then persist the statistics.
    pub fn run(self, epochs: usize) -> Result<TrainingRun<M>> {
        let Self {
            mut model,
            mut optimizer,
            mut schedule,
            mut stats,
            train,
            test,
            misclass,
            mut phases,
        } = self;

        tracing::info!(
            "Training for {} epochs (schedule={}, l1_lambda={})",
            epochs,
            schedule.kind(),
            train.l1_lambda(),
        );

        for epoch in 1..=epochs {
            enter(&mut phases, TrainerPhase::Training(epoch));
            model = train.run(model, &mut optimizer, &mut schedule, &mut stats);

            enter(&mut phases, TrainerPhase::Evaluating(epoch));
            if let Some(lr) = test.run(&model.valid(), &mut schedule, &mut stats) {
                optimizer.set_learning_rate(lr);
            }

            let lr = optimizer.learning_rate();
            stats.next_epoch(lr);
            println!("{}", stats.epoch_description());

            if let Some(next_lr) = schedule.step_epoch() {
                optimizer.set_learning_rate(next_lr);
            }
            println!("Learning Rate = {lr:.6}");
        }

        enter(&mut phases, TrainerPhase::Finalizing);
        misclass.run(&model.valid(), &mut stats)?;
        stats.save()?;

        Ok(TrainingRun { model, stats, schedule, phases })
    }
}

fn enter(phases: &mut Vec<TrainerPhase>, phase: TrainerPhase) {
    tracing::debug!("Trainer phase: {:?}", phase);
    phases.push(phase);
}
