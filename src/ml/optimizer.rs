use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
};

/// A burn optimizer paired with the learning rate it steps with.
///
/// burn optimizers take the rate as an argument on every step, so the
/// "parameter group" rate lives here. Schedulers write into it through
/// `set_learning_rate`; the coordinator reads it at each epoch boundary.
pub struct TrainingOptimizer<O> {
    inner:         O,
    learning_rate: f64,
}

impl<O> TrainingOptimizer<O> {
    pub fn new(inner: O, learning_rate: f64) -> Self {
        Self { inner, learning_rate }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) {
        self.learning_rate = learning_rate;
    }

    /// Apply one update. `grads` come fresh from a single backward pass,
    /// so nothing carries over from the previous batch.
    pub fn step<B, M>(&mut self, model: M, grads: GradientsParams) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        self.inner.step(self.learning_rate, model, grads)
    }
}
