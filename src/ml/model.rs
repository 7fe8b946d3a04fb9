use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{log_softmax, relu},
};

/// Anything the epoch runners can push a batch of images through.
///
/// `forward` must return LOG-probabilities of shape [batch, classes];
/// the loss is a negative log-likelihood over them.
pub trait ImageClassifier<B: Backend> {
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2>;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DigitNetConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
    #[config(default = 16)]
    pub channels:    usize,
    #[config(default = 64)]
    pub hidden:      usize,
}

impl DigitNetConfig {
    /// Expects 1×28×28 inputs: two 2×2 poolings leave a 7×7 map.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitNet<B> {
        let c = self.channels;
        let conv1 = Conv2dConfig::new([1, c], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([c, c * 2], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();
        let fc1  = LinearConfig::new(c * 2 * 7 * 7, self.hidden).init(device);
        let fc2  = LinearConfig::new(self.hidden, self.num_classes).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        DigitNet { conv1, conv2, pool, fc1, fc2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct DigitNet<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> ImageClassifier<B> for DigitNet<B> {
    /// images: [batch, 1, 28, 28] → log-probabilities: [batch, num_classes]
    fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(relu(self.conv1.forward(images))); // [b, c, 14, 14]
        let x = self.pool.forward(relu(self.conv2.forward(x)));      // [b, 2c, 7, 7]

        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        // Dropout is only active on an autodiff backend
        let x = self.dropout.forward(relu(self.fc1.forward(x)));
        log_softmax(self.fc2.forward(x), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_output_shape() {
        let device = Default::default();
        let model: DigitNet<TestBackend> = DigitNetConfig::new().init(&device);
        let images = Tensor::<TestBackend, 4>::zeros([3, 1, 28, 28], &device);
        assert_eq!(model.forward(images).dims(), [3, 10]);
    }

    #[test]
    fn test_forward_returns_log_probabilities() {
        let device = Default::default();
        let model: DigitNet<TestBackend> = DigitNetConfig::new().init(&device);
        let images = Tensor::<TestBackend, 4>::ones([2, 1, 28, 28], &device);

        // exp(log p) sums to 1 for each row
        let sums = model
            .forward(images)
            .exp()
            .sum_dim(1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-4, "row sum was {s}");
        }
    }
}
