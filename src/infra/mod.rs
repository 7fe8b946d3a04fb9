// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the output directory:
//
//   stats.rs      — ModelStats, the statistics recorder
//                   Accumulates per-batch train/test numbers,
//                   finalises them per epoch, holds the capped
//                   misclassified set and saves it all as JSON.
//
//   metrics.rs    — Training metrics logging
//                   Appends one CSV row per epoch (lr, losses,
//                   accuracies) for later plotting.
//
//   checkpoint.rs — Saving and loading model weights
//                   Uses Burn's CompactRecorder to serialise
//                   model parameters. Also saves/loads TrainConfig
//                   as JSON so `evaluate` can rebuild the model.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Statistics recorder shared by the epoch runners
pub mod stats;
