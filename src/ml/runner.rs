// ============================================================
// Layer 5 — Run Assembly
// ============================================================
// Turns a TrainConfig into concrete burn objects and runs them:
//
//   BackendKind   → Autodiff<NdArray> (CPU) | Autodiff<Wgpu> (GPU)
//   OptimizerKind → SGD (+ momentum) | Adam
//   SchedulerKind → LrSchedule variant:
//                     step      → PerEpoch(StepLr)
//                     one-cycle → PerBatch(OneCycleLr over every batch)
//                     plateau   → Plateau(ReduceLrOnPlateau, metric)
//
// Both `train` and `evaluate` end up here so no other layer has to
// name a backend type.
//
// Key Burn 0.20 insight:
//   - Training uses Autodiff<B> for gradients
//   - model.valid() returns the model on B itself
//   - the evaluation loader is built on that inner backend

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, Autodiff, NdArray, Wgpu},
    optim::{momentum::MomentumConfig, AdamConfig, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::{BackendKind, OptimizerKind, SchedulerKind, TrainConfig};
use crate::data::{build_loader, dataset::ImageDataset, dataset::MNIST_SHAPE, ImageLoader};
use crate::infra::{
    checkpoint::{CheckpointManager, FINAL_MODEL},
    stats::ModelStats,
};
use crate::ml::{
    misclass::MisclassificationCollector,
    model::{DigitNet, DigitNetConfig},
    optimizer::TrainingOptimizer,
    scheduler::{LrSchedule, OneCycleLr, ReduceLrOnPlateau, StepLr},
    test_epoch::TestEpoch,
    trainer::ModelTrainer,
};

pub const EVAL_STATS_FILE: &str = "eval_stats.json";

/// Train on the configured backend and save `model_final` into `ckpt`.
pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: ImageDataset,
    test_dataset:  ImageDataset,
    ckpt:          &CheckpointManager,
) -> Result<ModelStats> {
    match cfg.backend {
        BackendKind::NdArray => {
            train_on::<Autodiff<NdArray>>(cfg, train_dataset, test_dataset, ckpt, NdArrayDevice::Cpu)
        }
        BackendKind::Wgpu => {
            let device = WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_on::<Autodiff<Wgpu>>(cfg, train_dataset, test_dataset, ckpt, device)
        }
    }
}

/// Reload `model_final`, run one evaluation pass plus the
/// misclassification harvest, and save `eval_stats.json`.
pub fn run_evaluation(
    cfg:          &TrainConfig,
    test_dataset: ImageDataset,
    ckpt:         &CheckpointManager,
) -> Result<ModelStats> {
    match cfg.backend {
        BackendKind::NdArray => evaluate_on::<NdArray>(cfg, test_dataset, ckpt, NdArrayDevice::Cpu),
        BackendKind::Wgpu    => evaluate_on::<Wgpu>(cfg, test_dataset, ckpt, WgpuDevice::default()),
    }
}

pub fn model_config(cfg: &TrainConfig) -> DigitNetConfig {
    DigitNetConfig::new().with_dropout(cfg.dropout)
}

/// The schedule selected by `cfg.scheduler`. One-cycle spans every
/// batch of every epoch.
pub fn build_schedule(cfg: &TrainConfig, batches_per_epoch: usize) -> LrSchedule {
    match cfg.scheduler {
        SchedulerKind::None => LrSchedule::None,
        SchedulerKind::Step => LrSchedule::per_epoch(StepLr::new(cfg.lr, cfg.step_size, cfg.gamma)),
        SchedulerKind::OneCycle => {
            let total_steps = cfg.epochs.max(1) * batches_per_epoch.max(1);
            LrSchedule::per_batch(OneCycleLr::new(cfg.max_lr, total_steps))
        }
        SchedulerKind::Plateau => LrSchedule::plateau(
            ReduceLrOnPlateau::new(cfg.lr)
                .with_factor(cfg.plateau_factor)
                .with_patience(cfg.plateau_patience),
            cfg.plateau_metric,
        ),
    }
}

fn train_on<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: ImageDataset,
    test_dataset:  ImageDataset,
    ckpt:          &CheckpointManager,
    device:        B::Device,
) -> Result<ModelStats> {
    let batches_per_epoch = train_dataset.sample_count().div_ceil(cfg.batch_size);

    let train_loader = build_loader::<B>(
        train_dataset,
        MNIST_SHAPE,
        cfg.batch_size,
        cfg.num_workers,
        Some(cfg.seed),
        &device,
    );
    let test_loader = build_loader::<B::InnerBackend>(
        test_dataset,
        MNIST_SHAPE,
        cfg.batch_size,
        cfg.num_workers,
        None,
        &device,
    );

    let model: DigitNet<B> = model_config(cfg).init(&device);
    let schedule = build_schedule(cfg, batches_per_epoch);
    tracing::info!(
        "Model ready: optimizer={:?}, schedule={}, {} batches per epoch",
        cfg.optimizer,
        schedule.kind(),
        batches_per_epoch,
    );

    match cfg.optimizer {
        OptimizerKind::Sgd => {
            let momentum = (cfg.momentum > 0.0).then(|| {
                MomentumConfig::new()
                    .with_momentum(cfg.momentum)
                    .with_dampening(0.0)
            });
            let optim = SgdConfig::new()
                .with_momentum(momentum)
                .init::<B, DigitNet<B>>();
            fit(cfg, model, optim, schedule, train_loader, test_loader, ckpt, device)
        }
        OptimizerKind::Adam => {
            // m = β1*m + (1-β1)*g        (mean)
            // v = β2*v + (1-β2)*g²       (variance)
            // θ = θ - lr * m / (√v + ε)  (update)
            let optim = AdamConfig::new()
                .with_epsilon(1e-8)
                .init::<B, DigitNet<B>>();
            fit(cfg, model, optim, schedule, train_loader, test_loader, ckpt, device)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fit<B, O>(
    cfg:          &TrainConfig,
    model:        DigitNet<B>,
    optim:        O,
    schedule:     LrSchedule,
    train_loader: ImageLoader<B>,
    test_loader:  ImageLoader<B::InnerBackend>,
    ckpt:         &CheckpointManager,
    device:       B::Device,
) -> Result<ModelStats>
where
    B: AutodiffBackend,
    O: Optimizer<DigitNet<B>, B>,
{
    let run = ModelTrainer::new(
        model,
        TrainingOptimizer::new(optim, cfg.lr),
        ModelStats::new(ckpt.dir()),
        train_loader,
        test_loader,
        device,
    )
    .with_schedule(schedule)
    .with_l1_lambda(cfg.l1_lambda)
    .with_progress(cfg.show_progress)
    .run(cfg.epochs)?;

    ckpt.save_model(&run.model, FINAL_MODEL)?;
    Ok(run.stats)
}

fn evaluate_on<B: Backend>(
    cfg:          &TrainConfig,
    test_dataset: ImageDataset,
    ckpt:         &CheckpointManager,
    device:       B::Device,
) -> Result<ModelStats> {
    let model: DigitNet<B> = ckpt.load_model(model_config(cfg).init(&device), FINAL_MODEL, &device)?;
    let loader = build_loader::<B>(
        test_dataset,
        MNIST_SHAPE,
        cfg.batch_size,
        cfg.num_workers,
        None,
        &device,
    );

    let mut stats = ModelStats::new(ckpt.dir()).with_file_name(EVAL_STATS_FILE);
    TestEpoch::new(loader.clone(), device.clone()).run(&model, &mut LrSchedule::None, &mut stats);
    println!("{}", stats.evaluation_description());

    MisclassificationCollector::new(loader, device).run(&model, &mut stats)?;
    stats.save()?;
    Ok(stats)
}
