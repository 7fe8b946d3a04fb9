// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing the training
// run, with no burn types and no file I/O:
//
//   epoch.rs         — batch records, running totals, epoch summaries
//   misclassified.rs — misclassified samples and their capped set
//   traits.rs        — the learning-rate scheduler abstraction

// Per-batch and per-epoch statistics records
pub mod epoch;

// Misclassified evaluation samples (capped at 25)
pub mod misclassified;

// Core abstractions that other layers implement
pub mod traits;
