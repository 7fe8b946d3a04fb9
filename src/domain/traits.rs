// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Learning-rate schedulers are the one collaborator whose
// behaviour varies at runtime (step decay, one-cycle, a test
// double counting its calls, ...). The training components only
// ever see this trait, boxed inside `LrSchedule`.
//
// The plateau scheduler is deliberately NOT an implementation of
// this trait: it needs a monitored metric on every step, so it
// gets its own variant in `LrSchedule` instead.

/// A scheduler advanced without any external metric.
///
/// Implementations:
///   - StepLr     → multiply by gamma every `step_size` steps
///   - OneCycleLr → cosine warm-up to max_lr, then anneal down
pub trait LrScheduler: Send {
    /// Advance one unit (a batch or an epoch, depending on how the
    /// schedule is mounted) and return the new learning rate.
    fn step(&mut self) -> f64;

    /// The learning rate produced by the most recent step
    /// (or the initial rate before the first step).
    fn last_lr(&self) -> f64;
}
