// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// A single validation pass over <data>/val with a built or
// resumed model. No gradients, no checkpoints written.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::model_setup::{prepare_model, ModelOptions};
use crate::data::{dataset::EmotionDataset, folder::ImageFolder, transform::Transform};
use crate::domain::traits::ImageSource;
use crate::infra::metrics::PassMeters;
use crate::ml::{
    trainer::{build_val_loader, validate, PassSummary},
    InferBackend,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    pub data_dir:   String,
    pub model:      ModelOptions,
    pub batch_size: usize,
    pub workers:    usize,
    pub print_freq: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir:   "data".to_string(),
            model:      ModelOptions::default(),
            batch_size: 16,
            workers:    4,
            print_freq: 1,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvalConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PassSummary> {
        let cfg = &self.config;
        let val_root = Path::new(&cfg.data_dir).join("val");

        let folder = ImageFolder::new(&val_root);
        folder.class_map()?.ensure_emotion_count()?;
        let items = folder.load_all()?;
        if items.is_empty() {
            bail!("No validation images found under '{}'", val_root.display());
        }

        let device = burn::backend::wgpu::WgpuDevice::default();
        let (model, _) = prepare_model::<InferBackend>(&cfg.model, &device)?;

        let loader = build_val_loader::<InferBackend>(
            EmotionDataset::new(items, Transform::Eval),
            cfg.batch_size,
            cfg.workers,
            device,
        );
        validate(&model, loader.as_ref(), &mut PassMeters::new(), cfg.batch_size, cfg.print_freq)
    }
}
