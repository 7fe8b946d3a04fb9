// ============================================================
// Layer 3 — Misclassified Samples
// ============================================================
// An evaluation example whose predicted label differs from its
// true label, plus the bounded collection that stores them.
//
// The collection is capped at MISCLASSIFIED_CAP entries and
// `push` refuses anything past the cap. Collectors stop early
// once `is_full()` reports true.
//
// Order of insertion is preserved:
//   loader iteration order, then within-batch index order.

use serde::{Deserialize, Serialize};

/// Hard upper bound on stored misclassified samples
pub const MISCLASSIFIED_CAP: usize = 25;

/// One incorrectly predicted evaluation example.
/// Never mutated after it has been pushed into a `MisclassifiedSet`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MisclassifiedSample {
    /// Ground-truth class index
    pub target: usize,

    /// Class index the model predicted
    pub prediction: usize,

    /// Raw (normalised) input image, flattened CHW
    pub image: Vec<f32>,

    /// Image shape as [channels, height, width]
    pub shape: [usize; 3],
}

impl MisclassifiedSample {
    pub fn new(target: usize, prediction: usize, image: Vec<f32>, shape: [usize; 3]) -> Self {
        Self { target, prediction, image, shape }
    }
}

/// Ordered, capped sequence of misclassified samples.
/// Loading a stored set that holds more than its cap is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredSet")]
pub struct MisclassifiedSet {
    samples: Vec<MisclassifiedSample>,
    cap:     usize,
}

#[derive(Deserialize)]
struct StoredSet {
    samples: Vec<MisclassifiedSample>,
    cap:     usize,
}

impl TryFrom<StoredSet> for MisclassifiedSet {
    type Error = String;

    fn try_from(stored: StoredSet) -> Result<Self, Self::Error> {
        if stored.samples.len() > stored.cap {
            return Err(format!(
                "misclassified set holds {} samples but its cap is {}",
                stored.samples.len(),
                stored.cap,
            ));
        }
        Ok(Self { samples: stored.samples, cap: stored.cap })
    }
}

impl Default for MisclassifiedSet {
    fn default() -> Self {
        Self::with_cap(MISCLASSIFIED_CAP)
    }
}

impl MisclassifiedSet {
    /// Create an empty set that holds at most `cap` samples
    pub fn with_cap(cap: usize) -> Self {
        Self { samples: Vec::with_capacity(cap), cap }
    }

    /// Append a sample. Returns false (and drops the sample)
    /// when the set is already full.
    pub fn push(&mut self, sample: MisclassifiedSample) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.cap
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn samples(&self) -> &[MisclassifiedSample] {
        &self.samples
    }
}
