// ============================================================
// Layer 5 — Learning-Rate Schedules
// ============================================================
// Three schedulers and the tagged variant that decides WHEN they
// are stepped:
//
//   StepLr            lr = initial · γ^(⌊t / step_size⌋)
//   OneCycleLr        cosine warm-up from max_lr/div to max_lr over
//                     pct_start of the run, then cosine anneal to
//                     initial/final_div
//   ReduceLrOnPlateau multiply by `factor` after `patience` steps
//                     without a relative improvement of the metric
//
// LrSchedule is selected once when the trainer is built:
//
//   None      → never stepped
//   PerBatch  → stepped after every training batch
//   PerEpoch  → stepped once per epoch by the coordinator
//   Plateau   → stepped once per evaluation pass with a metric

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::traits::LrScheduler;

// ─── StepLr ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct StepLr {
    initial_lr: f64,
    step_size:  usize,
    gamma:      f64,
    steps:      usize,
    current:    f64,
}

impl StepLr {
    pub fn new(initial_lr: f64, step_size: usize, gamma: f64) -> Self {
        Self {
            initial_lr,
            step_size: step_size.max(1),
            gamma,
            steps: 0,
            current: initial_lr,
        }
    }
}

impl LrScheduler for StepLr {
    fn step(&mut self) -> f64 {
        self.steps += 1;
        let decays = (self.steps / self.step_size) as i32;
        self.current = self.initial_lr * self.gamma.powi(decays);
        self.current
    }

    fn last_lr(&self) -> f64 {
        self.current
    }
}

// ─── OneCycleLr ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct OneCycleLr {
    max_lr:      f64,
    initial_lr:  f64,
    min_lr:      f64,
    total_steps: usize,
    pct_start:   f64,
    steps:       usize,
    current:     f64,
}

impl OneCycleLr {
    pub const DEFAULT_PCT_START:       f64 = 0.3;
    pub const DEFAULT_DIV_FACTOR:      f64 = 25.0;
    pub const DEFAULT_FINAL_DIV_FACTOR: f64 = 1e4;

    pub fn new(max_lr: f64, total_steps: usize) -> Self {
        Self::with_factors(
            max_lr,
            total_steps,
            Self::DEFAULT_PCT_START,
            Self::DEFAULT_DIV_FACTOR,
            Self::DEFAULT_FINAL_DIV_FACTOR,
        )
    }

    pub fn with_factors(
        max_lr:           f64,
        total_steps:      usize,
        pct_start:        f64,
        div_factor:       f64,
        final_div_factor: f64,
    ) -> Self {
        let initial_lr = max_lr / div_factor;
        Self {
            max_lr,
            initial_lr,
            min_lr: initial_lr / final_div_factor,
            total_steps: total_steps.max(1),
            pct_start,
            steps: 0,
            current: initial_lr,
        }
    }

    pub fn min_lr(&self) -> f64 {
        self.min_lr
    }

    /// Learning rate at step `t`. Past the last step the floor is held.
    fn lr_at(&self, t: usize) -> f64 {
        let last    = (self.total_steps - 1) as f64;
        let t       = (t as f64).min(last);
        let warm_up = self.pct_start * self.total_steps as f64 - 1.0;

        if warm_up > 0.0 && t <= warm_up {
            cosine_anneal(self.initial_lr, self.max_lr, t / warm_up)
        } else {
            let start = warm_up.max(0.0);
            let span  = last - start;
            let pct   = if span > 0.0 { (t - start) / span } else { 1.0 };
            cosine_anneal(self.max_lr, self.min_lr, pct)
        }
    }
}

fn cosine_anneal(start: f64, end: f64, pct: f64) -> f64 {
    end + (start - end) / 2.0 * ((PI * pct).cos() + 1.0)
}

impl LrScheduler for OneCycleLr {
    fn step(&mut self) -> f64 {
        self.steps += 1;
        self.current = self.lr_at(self.steps);
        self.current
    }

    fn last_lr(&self) -> f64 {
        self.current
    }
}

// ─── ReduceLrOnPlateau ────────────────────────────────────────────────────────
/// Lower-is-better plateau detection with a relative threshold.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    factor:      f64,
    patience:    usize,
    threshold:   f64,
    cooldown:    usize,
    min_lr:      f64,
    eps:         f64,
    best:        f64,
    bad_steps:   usize,
    cooldown_left: usize,
    steps:       usize,
    current:     f64,
}

impl ReduceLrOnPlateau {
    pub fn new(initial_lr: f64) -> Self {
        Self {
            factor:    0.1,
            patience:  10,
            threshold: 1e-4,
            cooldown:  0,
            min_lr:    0.0,
            eps:       1e-8,
            best:      f64::INFINITY,
            bad_steps: 0,
            cooldown_left: 0,
            steps:     0,
            current:   initial_lr,
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_cooldown(mut self, cooldown: usize) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_min_lr(mut self, min_lr: f64) -> Self {
        self.min_lr = min_lr;
        self
    }

    /// Feed one observation of the monitored metric
    pub fn step(&mut self, metric: f64) -> f64 {
        self.steps += 1;

        if metric < self.best * (1.0 - self.threshold) {
            self.best      = metric;
            self.bad_steps = 0;
        } else {
            self.bad_steps += 1;
        }

        if self.cooldown_left > 0 {
            self.cooldown_left -= 1;
            self.bad_steps      = 0;
        }

        if self.bad_steps > self.patience {
            let reduced = (self.current * self.factor).max(self.min_lr);
            if self.current - reduced > self.eps {
                tracing::info!(
                    "Plateau detected after {} steps: lr {:.6} -> {:.6}",
                    self.steps,
                    self.current,
                    reduced,
                );
                self.current = reduced;
            }
            self.cooldown_left = self.cooldown;
            self.bad_steps     = 0;
        }

        self.current
    }

    pub fn last_lr(&self) -> f64 {
        self.current
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Lowest metric seen so far
    pub fn best(&self) -> f64 {
        self.best
    }
}

// ─── LrSchedule ───────────────────────────────────────────────────────────────
/// Which evaluation loss the plateau scheduler watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlateauMetric {
    /// Summed loss of the last evaluation batch
    LastBatchLoss,
    /// Summed loss of the whole pass divided by its sample count
    EpochLoss,
}

impl Default for PlateauMetric {
    fn default() -> Self {
        Self::LastBatchLoss
    }
}

impl FromStr for PlateauMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-batch" | "last-batch-loss" => Ok(Self::LastBatchLoss),
            "epoch" | "epoch-loss"           => Ok(Self::EpochLoss),
            other => Err(format!("unknown plateau metric '{other}' (expected last-batch or epoch)")),
        }
    }
}

pub enum LrSchedule {
    None,
    PerBatch(Box<dyn LrScheduler>),
    PerEpoch(Box<dyn LrScheduler>),
    Plateau {
        scheduler: ReduceLrOnPlateau,
        metric:    PlateauMetric,
    },
}

impl LrSchedule {
    pub fn per_batch(scheduler: impl LrScheduler + 'static) -> Self {
        Self::PerBatch(Box::new(scheduler))
    }

    pub fn per_epoch(scheduler: impl LrScheduler + 'static) -> Self {
        Self::PerEpoch(Box::new(scheduler))
    }

    pub fn plateau(scheduler: ReduceLrOnPlateau, metric: PlateauMetric) -> Self {
        Self::Plateau { scheduler, metric }
    }

    /// Learning rate the active scheduler starts from
    pub fn current_lr(&self) -> Option<f64> {
        match self {
            Self::None                    => None,
            Self::PerBatch(s)             => Some(s.last_lr()),
            Self::PerEpoch(s)             => Some(s.last_lr()),
            Self::Plateau { scheduler, .. } => Some(scheduler.last_lr()),
        }
    }

    /// Rate to show per training batch when batches are scheduled
    pub fn batch_lr(&self) -> Option<f64> {
        match self {
            Self::PerBatch(s) => Some(s.last_lr()),
            _                 => None,
        }
    }

    /// Called after every training batch
    pub fn step_batch(&mut self) -> Option<f64> {
        match self {
            Self::PerBatch(s) => Some(s.step()),
            _                 => None,
        }
    }

    /// Called once per epoch by the coordinator
    pub fn step_epoch(&mut self) -> Option<f64> {
        match self {
            Self::PerEpoch(s) => Some(s.step()),
            _                 => None,
        }
    }

    pub fn plateau_metric(&self) -> Option<PlateauMetric> {
        match self {
            Self::Plateau { metric, .. } => Some(*metric),
            _                            => None,
        }
    }

    /// Called once per evaluation pass
    pub fn step_plateau(&mut self, value: f64) -> Option<f64> {
        match self {
            Self::Plateau { scheduler, .. } => Some(scheduler.step(value)),
            _                               => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None           => "none",
            Self::PerBatch(_)    => "per-batch",
            Self::PerEpoch(_)    => "per-epoch",
            Self::Plateau { .. } => "plateau",
        }
    }
}

impl fmt::Debug for LrSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrSchedule")
            .field("kind", &self.kind())
            .field("lr", &self.current_lr())
            .finish()
    }
}
