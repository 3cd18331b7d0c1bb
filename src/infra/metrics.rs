// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two pieces:
//
//   AverageMeter  — running value / sum / count / average used
//                   for per-batch loss, accuracy and timings
//
//   MetricsLogger — appends one CSV row per epoch to
//                   <checkpoint-dir>/metrics.csv
//
// Example CSV output:
//   epoch,lr,train_loss,train_acc,val_loss,val_acc
//   1,0.000100,1.812345,28.125000,1.701234,33.750000
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

// ─── AverageMeter ─────────────────────────────────────────────────────────────
/// Computes and stores the average and current value
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AverageMeter {
    pub val:   f64,
    pub avg:   f64,
    pub sum:   f64,
    pub count: usize,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record `val` as the mean of `n` samples
    pub fn update(&mut self, val: f64, n: usize) {
        self.val    = val;
        self.sum   += val * n as f64;
        self.count += n;
        if self.count > 0 {
            self.avg = self.sum / self.count as f64;
        }
    }
}

// ─── PassMeters ───────────────────────────────────────────────────────────────
/// The four meters of one train or validation pass. Owned by the
/// epoch loop and reset at the start of every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassMeters {
    pub batch_time: AverageMeter,
    pub data_time:  AverageMeter,
    pub losses:     AverageMeter,
    pub acc:        AverageMeter,
}

impl PassMeters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.batch_time.reset();
        self.data_time.reset();
        self.losses.reset();
        self.acc.reset();
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of the metrics CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch:      usize,
    /// Learning rate used for this epoch
    pub lr:         f64,
    pub train_loss: f64,
    /// Top-1 training accuracy in percent
    pub train_acc:  f64,
    pub val_loss:   f64,
    /// Top-1 validation accuracy in percent
    pub val_acc:    f64,
}

impl EpochMetrics {
    /// Returns true if this epoch beats the previous best accuracy
    pub fn is_improvement(&self, best_val_acc: f64) -> bool {
        self.val_acc > best_val_acc
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so a
    /// resumed run keeps appending to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,lr,train_loss,train_acc,val_loss,val_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.lr, m.train_loss, m.train_acc, m.val_loss, m.val_acc,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
