// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a raw image source and a device-resident
// tensor batch:
//
//   MNIST (burn vision) / synthetic pool
//       │
//       ▼
//   split_train_test  → seeded split (synthetic pool only)
//       │
//       ▼
//   ImageDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher      → stacks items into [N, C, H, W] tensors
//       │
//       ▼
//   DataLoader        → lazy, restartable batch sequence
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// ImageItem, ImageDataset and the synthetic digit generator
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded shuffle + split into train/test sets
pub mod splitter;

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use batcher::{ImageBatch, ImageBatcher};
use dataset::ImageDataset;

/// The loader type every training component consumes
pub type ImageLoader<B> = Arc<dyn DataLoader<B, ImageBatch<B>>>;

/// Build a loader over `dataset`. Shuffles only when `shuffle_seed` is set.
pub fn build_loader<B: Backend>(
    dataset:      ImageDataset,
    shape:        [usize; 3],
    batch_size:   usize,
    num_workers:  usize,
    shuffle_seed: Option<u64>,
    device:       &B::Device,
) -> ImageLoader<B> {
    let mut builder = DataLoaderBuilder::new(ImageBatcher::new(shape))
        .batch_size(batch_size)
        .set_device(device.clone());

    // Zero workers keeps iteration on the calling thread
    if num_workers > 0 {
        builder = builder.num_workers(num_workers);
    }

    match shuffle_seed {
        Some(seed) => builder.shuffle(seed).build(dataset),
        None       => builder.build(dataset),
    }
}
