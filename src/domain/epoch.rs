// ============================================================
// Layer 3 — Batch and Epoch Statistics Types
// ============================================================
// Plain data records used by the statistics recorder:
//
//   BatchStats     — one training batch as shown in the progress bar
//   RunningTotals  — loss / correct / sample sums for one pass,
//                    mutated per batch, reset at each epoch boundary
//   EpochSummary   — finalised aggregates for one epoch
//
// Loss conventions follow the two passes:
//   - training batches report a MEAN loss per batch, so the epoch
//     train loss is the average over batches
//   - evaluation batches report a SUMMED loss, so the epoch test
//     loss is the total divided by the number of samples

use serde::{Deserialize, Serialize};

/// One recorded training batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchStats {
    pub loss:          f64,
    pub correct:       usize,
    pub samples:       usize,
    pub learning_rate: f64,
}

impl BatchStats {
    /// Fraction of samples in this batch predicted correctly
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.samples)
    }
}

/// Accumulated sums for one training or evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningTotals {
    pub loss:    f64,
    pub correct: usize,
    pub samples: usize,
    pub batches: usize,
}

impl RunningTotals {
    pub fn add(&mut self, loss: f64, correct: usize, samples: usize) {
        self.loss    += loss;
        self.correct += correct;
        self.samples += samples;
        self.batches += 1;
    }

    /// Average of per-batch losses (for mean-reduced batch losses)
    pub fn loss_per_batch(&self) -> f64 {
        if self.batches == 0 { 0.0 } else { self.loss / self.batches as f64 }
    }

    /// Total loss divided by sample count (for sum-reduced batch losses)
    pub fn loss_per_sample(&self) -> f64 {
        if self.samples == 0 { 0.0 } else { self.loss / self.samples as f64 }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct, self.samples)
    }
}

/// Finalised metrics for one epoch.
/// Accuracies are fractions in [0.0, 1.0].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch:          usize,
    pub learning_rate:  f64,
    pub train_loss:     f64,
    pub train_accuracy: f64,
    pub test_loss:      f64,
    pub test_accuracy:  f64,
}

impl EpochSummary {
    pub fn from_totals(
        epoch:         usize,
        learning_rate: f64,
        train:         &RunningTotals,
        test:          &RunningTotals,
    ) -> Self {
        Self {
            epoch,
            learning_rate,
            train_loss:     train.loss_per_batch(),
            train_accuracy: train.accuracy(),
            test_loss:      test.loss_per_sample(),
            test_accuracy:  test.accuracy(),
        }
    }
}

fn ratio(correct: usize, samples: usize) -> f64 {
    if samples == 0 { 0.0 } else { correct as f64 / samples as f64 }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_totals_accumulate() {
        let mut t = RunningTotals::default();
        t.add(1.0, 3, 4);
        t.add(3.0, 1, 4);
        assert_eq!(t.batches, 2);
        assert_eq!(t.samples, 8);
        assert!((t.loss_per_batch() - 2.0).abs() < 1e-12);
        assert!((t.loss_per_sample() - 0.5).abs() < 1e-12);
        assert!((t.accuracy() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_totals_do_not_divide_by_zero() {
        let t = RunningTotals::default();
        assert_eq!(t.loss_per_batch(), 0.0);
        assert_eq!(t.loss_per_sample(), 0.0);
        assert_eq!(t.accuracy(), 0.0);
    }

    #[test]
    fn test_summary_uses_batch_mean_for_train_and_sample_mean_for_test() {
        let mut train = RunningTotals::default();
        train.add(2.0, 4, 4);
        train.add(4.0, 2, 4);
        let mut test = RunningTotals::default();
        test.add(10.0, 5, 10);

        let s = EpochSummary::from_totals(1, 0.01, &train, &test);
        assert!((s.train_loss - 3.0).abs() < 1e-12);
        assert!((s.train_accuracy - 0.75).abs() < 1e-12);
        assert!((s.test_loss - 1.0).abs() < 1e-12);
        assert!((s.test_accuracy - 0.5).abs() < 1e-12);
    }
}
