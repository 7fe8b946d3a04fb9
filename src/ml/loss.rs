// ============================================================
// Layer 5 — Loss and Accuracy Helpers
// ============================================================
// The model emits log-probabilities, so the loss is a plain
// negative log-likelihood: pick the log-probability of the true
// class per row, negate, then reduce.
//
//   training:   mean NLL  (+ λ · Σ|θ| when L1 is enabled)
//   evaluation: summed NLL (divided by sample count per epoch)
//
// The L1 term walks every float parameter of the module with a
// ModuleVisitor so it works for any burn Module, not only DigitNet.

use burn::{
    module::{Module, ModuleVisitor, Param},
    prelude::*,
};

/// How a per-sample loss vector collapses to a scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NllReduction {
    Mean,
    Sum,
}

/// Negative log-likelihood of `targets` under `log_probs`.
///
/// log_probs: [batch, classes], targets: [batch] → loss: [1]
pub fn nll_loss<B: Backend>(
    log_probs: Tensor<B, 2>,
    targets:   Tensor<B, 1, Int>,
    reduction: NllReduction,
) -> Tensor<B, 1> {
    let picked = log_probs
        .gather(1, targets.unsqueeze_dim::<2>(1)) // [batch, 1]
        .neg();

    match reduction {
        NllReduction::Mean => picked.mean(),
        NllReduction::Sum  => picked.sum(),
    }
}

// ─── L1 Penalty ───────────────────────────────────────────────────────────────
struct AbsSum<B: Backend> {
    total: Option<Tensor<B, 1>>,
}

impl<B: Backend> ModuleVisitor<B> for AbsSum<B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        let term = param.val().abs().sum();
        self.total = Some(match self.total.take() {
            Some(acc) => acc + term,
            None      => term,
        });
    }
}

/// Σ|θ| over every float parameter of `model`.
/// None for a module without parameters.
pub fn l1_penalty<B: Backend, M: Module<B>>(model: &M) -> Option<Tensor<B, 1>> {
    let mut visitor = AbsSum { total: None };
    model.visit(&mut visitor);
    visitor.total
}

/// Mean NLL plus `l1_lambda · Σ|θ|` when `l1_lambda > 0`.
pub fn training_loss<B: Backend, M: Module<B>>(
    model:     &M,
    log_probs: Tensor<B, 2>,
    targets:   Tensor<B, 1, Int>,
    l1_lambda: f64,
) -> Tensor<B, 1> {
    let loss = nll_loss(log_probs, targets, NllReduction::Mean);
    if l1_lambda <= 0.0 {
        return loss;
    }
    match l1_penalty(model) {
        Some(penalty) => loss + penalty.mul_scalar(l1_lambda),
        None          => loss,
    }
}

// ─── Accuracy ─────────────────────────────────────────────────────────────────
/// argmax class per row — shape [batch]
pub fn predictions<B: Backend>(log_probs: Tensor<B, 2>) -> Tensor<B, 1, Int> {
    // argmax(1) returns [batch, 1]
    log_probs.argmax(1).flatten::<1>(0, 1)
}

/// Number of rows whose argmax equals the target
pub fn correct_count<B: Backend>(log_probs: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    predictions(log_probs)
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{DigitNet, DigitNetConfig, ImageClassifier};
    use burn::{backend::NdArray, tensor::activation::log_softmax};

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    fn fixture() -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 1, Int>) {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[2.0, 0.5, 0.1], [0.2, 0.3, 3.0]],
            &device,
        );
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);
        (log_softmax(logits, 1), targets)
    }

    #[test]
    fn test_nll_sum_is_batch_size_times_mean() {
        let (log_probs, targets) = fixture();
        let mean = scalar(nll_loss(log_probs.clone(), targets.clone(), NllReduction::Mean));
        let sum  = scalar(nll_loss(log_probs, targets, NllReduction::Sum));
        assert!(mean > 0.0);
        assert!((sum - 2.0 * mean).abs() < 1e-5);
    }

    #[test]
    fn test_nll_matches_hand_computed_value() {
        let (log_probs, targets) = fixture();
        let rows = log_probs.clone().into_data().convert::<f64>().to_vec::<f64>().unwrap();
        // row 0 target 0, row 1 target 1 (3 classes per row)
        let expected = -(rows[0] + rows[4]);
        let got = scalar(nll_loss(log_probs, targets, NllReduction::Sum));
        assert!((got - expected).abs() < 1e-5);
    }

    #[test]
    fn test_correct_count() {
        let (log_probs, targets) = fixture();
        // row 0 argmax = 0 (correct), row 1 argmax = 2 (wrong)
        assert_eq!(correct_count(log_probs, targets), 1);
    }

    fn model_and_batch() -> (
        DigitNet<TestBackend>,
        Tensor<TestBackend, 2>,
        Tensor<TestBackend, 1, Int>,
    ) {
        let device = Default::default();
        let model: DigitNet<TestBackend> = DigitNetConfig::new().init(&device);
        let images  = Tensor::<TestBackend, 4>::ones([4, 1, 28, 28], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 2, 3], &device);
        let log_probs = model.forward(images);
        (model, log_probs, targets)
    }

    #[test]
    fn test_zero_l1_equals_plain_nll() {
        let (model, log_probs, targets) = model_and_batch();
        let plain = scalar(nll_loss(log_probs.clone(), targets.clone(), NllReduction::Mean));
        let with  = scalar(training_loss(&model, log_probs, targets, 0.0));
        assert_eq!(plain, with);
    }

    #[test]
    fn test_positive_l1_strictly_increases_loss() {
        let (model, log_probs, targets) = model_and_batch();
        let plain = scalar(nll_loss(log_probs.clone(), targets.clone(), NllReduction::Mean));
        let with  = scalar(training_loss(&model, log_probs, targets, 1e-4));
        assert!(with > plain, "{with} should exceed {plain}");
    }

    #[test]
    fn test_l1_penalty_sums_all_parameters() {
        let device = Default::default();
        let model: DigitNet<TestBackend> = DigitNetConfig::new().init(&device);
        let penalty = scalar(l1_penalty(&model).unwrap());

        let by_hand: f64 = [
            model.conv1.weight.val().abs().sum(),
            model.conv2.weight.val().abs().sum(),
            model.fc1.weight.val().abs().sum(),
            model.fc2.weight.val().abs().sum(),
        ]
        .into_iter()
        .map(scalar)
        .sum();

        // Biases add on top of the weights
        assert!(penalty >= by_hand - 1e-3);
        assert!(penalty > 0.0);
    }
}
