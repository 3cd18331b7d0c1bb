// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each:
// training, a single evaluation pass, or test-set prediction.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination

// Backbone construction + checkpoint resume, shared by all three
pub mod model_setup;

// The fine-tuning workflow
pub mod train_use_case;

// One validation pass over <data>/val
pub mod evaluate_use_case;

// Per-image and per-subject prediction CSVs
pub mod test_use_case;
