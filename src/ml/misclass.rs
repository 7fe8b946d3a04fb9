// ============================================================
// Layer 5 — Misclassification Harvest
// ============================================================
// One eval-form pass over the evaluation loader that copies every
// sample whose argmax differs from its label into the recorder's
// MisclassifiedSet, in loader order then within-batch order.
//
// The set refuses pushes past its cap, so the pass:
//   - stops mid-batch as soon as the set reports full
//   - skips every remaining batch once it is full at a boundary
//
// Running the collector again on a full set adds nothing.

use anyhow::{anyhow, Result};
use burn::prelude::*;

use crate::data::ImageLoader;
use crate::domain::misclassified::MisclassifiedSample;
use crate::infra::stats::ModelStats;
use crate::ml::{loss::predictions, model::ImageClassifier};

pub struct MisclassificationCollector<B: Backend> {
    loader: ImageLoader<B>,
    device: B::Device,
}

impl<B: Backend> MisclassificationCollector<B> {
    pub fn new(loader: ImageLoader<B>, device: B::Device) -> Self {
        Self { loader, device }
    }

    /// Returns how many samples this pass added.
    pub fn run<M>(&self, model: &M, stats: &mut ModelStats) -> Result<usize>
    where
        M: ImageClassifier<B>,
    {
        let mut added = 0;

        for batch in self.loader.iter() {
            if stats.misclassified().is_full() {
                break;
            }

            let batch = batch.to_device(&self.device);
            let [_, channels, height, width] = batch.images.dims();
            let shape = [channels, height, width];
            let image_len = channels * height * width;

            let preds = predictions(model.forward(batch.images.clone()));
            let preds   = int_values(preds)?;
            let targets = int_values(batch.targets)?;
            let pixels  = batch
                .images
                .into_data()
                .convert::<f32>()
                .to_vec::<f32>()
                .map_err(|err| anyhow!("Cannot read image batch: {err:?}"))?;

            for (index, (&target, &prediction)) in targets.iter().zip(&preds).enumerate() {
                if target == prediction {
                    continue;
                }
                let image  = pixels[index * image_len..(index + 1) * image_len].to_vec();
                let sample = MisclassifiedSample::new(target as usize, prediction as usize, image, shape);
                if !stats.misclassified_mut().push(sample) {
                    break;
                }
                added += 1;
            }
        }

        tracing::info!(
            "Collected {} misclassified samples ({} stored)",
            added,
            stats.misclassified().len(),
        );
        Ok(added)
    }
}

fn int_values<B: Backend>(tensor: Tensor<B, 1, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|err| anyhow!("Cannot read label tensor: {err:?}"))
}
