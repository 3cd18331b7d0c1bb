// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file outputs:
//
//   checkpoint.rs     — model weights + progress metadata,
//                       best-model copy, run config JSON
//
//   metrics.rs        — running-average meters and the per-epoch
//                       metrics CSV
//
//   prediction_csv.rs — per-image / per-subject probability CSVs
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Meters and training metrics CSV logger
pub mod metrics;

/// Probability CSV output
pub mod prediction_csv;
