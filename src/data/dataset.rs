use burn::data::dataset::{
    vision::{MnistDataset, MnistItem},
    Dataset,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const MNIST_SHAPE: [usize; 3] = [1, 28, 28];
pub const NUM_CLASSES: usize = 10;

// MNIST training-set statistics
const MNIST_MEAN: f32 = 0.1307;
const MNIST_STD:  f32 = 0.3081;

/// One normalised image with its class label.
/// Pixels are stored flattened in CHW order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub label:  usize,
}

impl ImageItem {
    pub fn new(pixels: Vec<f32>, label: usize) -> Self {
        Self { pixels, label }
    }

    pub fn from_mnist(item: MnistItem) -> Self {
        let pixels = item
            .image
            .iter()
            .flat_map(|row| row.iter())
            .map(|&p| (p / 255.0 - MNIST_MEAN) / MNIST_STD)
            .collect();
        Self { pixels, label: item.label as usize }
    }
}

pub enum ImageDataset {
    InMemory(Vec<ImageItem>),
    Mnist(MnistDataset),
}

impl ImageDataset {
    pub fn in_memory(items: Vec<ImageItem>) -> Self {
        Self::InMemory(items)
    }

    /// Downloads on first use into burn's dataset cache
    pub fn mnist_train() -> Self {
        Self::Mnist(MnistDataset::train())
    }

    pub fn mnist_test() -> Self {
        Self::Mnist(MnistDataset::test())
    }

    pub fn sample_count(&self) -> usize {
        self.len()
    }
}

impl Dataset<ImageItem> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        match self {
            Self::InMemory(items) => items.get(index).cloned(),
            Self::Mnist(mnist)    => mnist.get(index).map(ImageItem::from_mnist),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::InMemory(items) => items.len(),
            Self::Mnist(mnist)    => mnist.len(),
        }
    }
}

/// Deterministic MNIST-shaped images for offline runs.
/// Class `k` lights a vertical stripe at a class-specific column on top
/// of low-amplitude noise, so a small CNN can separate the classes.
pub fn synthetic_digits(count: usize, seed: u64) -> Vec<ImageItem> {
    let [_, height, width] = MNIST_SHAPE;
    let mut rng = StdRng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            let label  = rng.gen_range(0..NUM_CLASSES);
            let column = 2 + label * 2 + label / 2;
            let mut pixels: Vec<f32> = (0..height * width)
                .map(|_| rng.gen::<f32>() * 0.2)
                .collect();
            for row in 4..height - 4 {
                pixels[row * width + column]     = 1.0;
                pixels[row * width + column + 1] = 1.0;
            }
            ImageItem::new(pixels, label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_digits_shape_and_labels() {
        let items = synthetic_digits(32, 7);
        assert_eq!(items.len(), 32);
        for item in &items {
            assert_eq!(item.pixels.len(), 28 * 28);
            assert!(item.label < NUM_CLASSES);
        }
    }

    #[test]
    fn test_synthetic_digits_deterministic_for_seed() {
        assert_eq!(synthetic_digits(8, 3), synthetic_digits(8, 3));
        assert_ne!(synthetic_digits(8, 3), synthetic_digits(8, 4));
    }

    #[test]
    fn test_in_memory_dataset_get_and_len() {
        let ds = ImageDataset::in_memory(synthetic_digits(5, 1));
        assert_eq!(ds.len(), 5);
        assert!(ds.get(4).is_some());
        assert!(ds.get(5).is_none());
    }

    #[test]
    fn test_mnist_item_normalisation() {
        let mut image = [[0.0f32; 28]; 28];
        image[0][0] = 255.0;
        let item = ImageItem::from_mnist(MnistItem { image, label: 3 });
        assert_eq!(item.label, 3);
        assert!((item.pixels[0] - (1.0 - MNIST_MEAN) / MNIST_STD).abs() < 1e-5);
        assert!((item.pixels[1] - (-MNIST_MEAN / MNIST_STD)).abs() < 1e-5);
    }
}
