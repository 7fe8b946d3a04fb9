//! Shared fixtures for the ML layer's unit tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use burn::{
    backend::{Autodiff, NdArray},
    prelude::*,
};

use crate::data::{
    build_loader,
    dataset::{synthetic_digits, ImageDataset, ImageItem, MNIST_SHAPE},
    ImageLoader,
};
use crate::domain::traits::LrScheduler;

pub type EvalBackend  = NdArray;
pub type TrainBackend = Autodiff<EvalBackend>;

/// `samples` synthetic digits in fixed order, `batch_size` per batch
pub fn image_loader<B: Backend>(samples: usize, batch_size: usize) -> ImageLoader<B> {
    loader_from_items(synthetic_digits(samples, 11), batch_size)
}

pub fn loader_from_items<B: Backend>(items: Vec<ImageItem>, batch_size: usize) -> ImageLoader<B> {
    build_loader(
        ImageDataset::in_memory(items),
        MNIST_SHAPE,
        batch_size,
        0,
        None,
        &Default::default(),
    )
}

/// Constant-rate scheduler that counts how often it is stepped
pub struct CountingScheduler {
    pub calls: Arc<AtomicUsize>,
    lr:        f64,
}

impl CountingScheduler {
    pub fn new(lr: f64) -> Self {
        Self { calls: Arc::new(AtomicUsize::new(0)), lr }
    }
}

impl LrScheduler for CountingScheduler {
    fn step(&mut self) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.lr
    }

    fn last_lr(&self) -> f64 {
        self.lr
    }
}
