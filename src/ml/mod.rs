// ============================================================
// Layer 5 — ML / Training Layer (Burn)
// ============================================================
// All model, optimizer and training-loop code lives here. The
// data layer hands in ImageLoaders; the infra layer receives a
// ModelStats recorder and model records.
//
// What's in this layer:
//
//   model.rs      — DigitNet: two conv blocks + two linear layers,
//                   log-softmax output
//   loss.rs       — NLL loss, L1 penalty over every float param,
//                   argmax accuracy
//   optimizer.rs  — a burn optimizer paired with its learning rate
//   scheduler.rs  — StepLr, OneCycleLr, ReduceLrOnPlateau and the
//                   LrSchedule variant that decides when to step
//
//   train_epoch.rs — one training pass (autodiff backend)
//   test_epoch.rs  — one evaluation pass (inner backend)
//   misclass.rs    — capped harvest of misclassified samples
//   trainer.rs     — ModelTrainer: epochs → harvest → save stats
//   runner.rs      — TrainConfig → backend, optimizer, schedule
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Convolutional digit classifier
pub mod model;

pub mod loss;

pub mod optimizer;

/// Learning-rate schedulers and their stepping policy
pub mod scheduler;

/// One pass over the training loader
pub mod train_epoch;

/// One pass over the evaluation loader
pub mod test_epoch;

pub mod misclass;

/// Epoch coordinator
pub mod trainer;

/// Config-driven entry points for `train` and `evaluate`
pub mod runner;

#[cfg(test)]
mod test_support;
