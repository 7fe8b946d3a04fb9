// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal: training a classifier, or evaluating a trained one.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No direct file access (that's Layer 6)
//   - Only workflow coordination and configuration
//
// TrainConfig lives here: it is what the CLI produces and what
// the ML layer consumes.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow and its configuration
pub mod train_use_case;

// Reload a trained model and evaluate it
pub mod evaluate_use_case;
