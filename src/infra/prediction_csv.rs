// ============================================================
// Layer 6 — Prediction CSV Writer
// ============================================================
// Writes id → probability rows with the fixed header
//   id,Angry,Disgust,Fear,Happy,Neutral,Sad,Surprise
// Rows come out sorted by id because the input is a BTreeMap.
// Ids are file paths, so the csv crate quotes them when needed.

use anyhow::{Context, Result};
use std::{collections::BTreeMap, path::PathBuf};

use crate::domain::{
    emotion::{Emotion, NUM_EMOTIONS},
    traits::PredictionSink,
};

pub struct ProbabilityCsv {
    path: PathBuf,
}

impl ProbabilityCsv {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PredictionSink for ProbabilityCsv {
    fn write_all(&self, rows: &BTreeMap<String, [f32; NUM_EMOTIONS]>) -> Result<()> {
        let mut w = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Cannot create '{}'", self.path.display()))?;

        w.write_record(Emotion::csv_header())?;
        for (id, probs) in rows {
            let mut record = Vec::with_capacity(NUM_EMOTIONS + 1);
            record.push(id.clone());
            record.extend(probs.iter().map(|p| p.to_string()));
            w.write_record(&record)?;
        }
        w.flush()?;

        tracing::info!("Wrote {} rows to '{}'", rows.len(), self.path.display());
        Ok(())
    }
}
