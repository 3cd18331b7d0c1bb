// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to datasets and prediction outputs
// through these traits only:
//   - ImageFolder / TestImageFolder implement ImageSource
//   - ProbabilityCsv implements PredictionSink
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::collections::BTreeMap;

use crate::domain::emotion::NUM_EMOTIONS;

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Anything that can enumerate the images of a dataset split.
pub trait ImageSource {
    /// Labelled or unlabelled image reference
    type Item;

    /// Enumerate every image in a deterministic order
    fn load_all(&self) -> Result<Vec<Self::Item>>;
}

// ─── PredictionSink ───────────────────────────────────────────────────────────
/// Destination for id → probability rows.
/// A BTreeMap keeps rows sorted by id.
pub trait PredictionSink {
    fn write_all(&self, rows: &BTreeMap<String, [f32; NUM_EMOTIONS]>) -> Result<()>;
}
