// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<ImageItem>
// into one image tensor and one label tensor.
//
//   Input:  N ImageItems, each with C*H*W pixels
//   Output: ImageBatch with images [N, C, H, W] and targets [N]
//
// The DataLoader passes the target device into `batch`, so the
// same batcher serves both the autodiff (training) backend and
// the inner (evaluation) backend.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageItem;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels — shape: [batch_size, channels, height, width]
    pub images: Tensor<B, 4>,

    /// Class indices — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    /// Move both tensors onto `device`
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            images:  self.images.to_device(device),
            targets: self.targets.to_device(device),
        }
    }

    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    /// Per-item shape as [channels, height, width]
    pub shape: [usize; 3],
}

impl ImageBatcher {
    pub fn new(shape: [usize; 3]) -> Self {
        Self { shape }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let [channels, height, width] = self.shape;

        // ── Flatten pixels ────────────────────────────────────────────────────
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .map(|item| item.label as i64)
            .collect();

        // ── Create tensors ────────────────────────────────────────────────────
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(pixels, [batch_size, channels, height, width]),
            device,
        );

        let targets = Tensor::<B, 1, Int>::from_ints(
            TensorData::new(labels, [batch_size]),
            device,
        );

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes() {
        let device  = Default::default();
        let batcher = ImageBatcher::new([1, 2, 2]);
        let items = vec![
            ImageItem::new(vec![0.0, 1.0, 2.0, 3.0], 1),
            ImageItem::new(vec![4.0, 5.0, 6.0, 7.0], 2),
            ImageItem::new(vec![8.0, 9.0, 10.0, 11.0], 0),
        ];

        let batch: ImageBatch<TestBackend> = batcher.batch(items, &device);
        assert_eq!(batch.images.dims(), [3, 1, 2, 2]);
        assert_eq!(batch.targets.dims(), [3]);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_batch_preserves_labels_in_order() {
        let device  = Default::default();
        let batcher = ImageBatcher::new([1, 1, 1]);
        let items = vec![
            ImageItem::new(vec![0.5], 7),
            ImageItem::new(vec![0.5], 3),
        ];

        let batch: ImageBatch<TestBackend> = batcher.batch(items, &device);
        let labels = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(labels, vec![7, 3]);
    }
}
