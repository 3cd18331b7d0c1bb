// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full fine-tuning pipeline in order:
//
//   Step 1: Scan <data>/train and <data>/val   (Layer 4 - data)
//   Step 2: Check the class folders            (Layer 3 - domain)
//   Step 3: Build Burn datasets                (Layer 4 - data)
//   Step 4: Save config                        (Layer 6 - infra)
//   Step 5: Build / resume the model           (Layer 5 - ml)
//   Step 6: Run the epoch loop                 (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::model_setup::{prepare_model, ModelOptions};
use crate::data::{dataset::EmotionDataset, folder::ImageFolder, transform::Transform};
use crate::domain::{class_map::ClassMap, image::LabelledImage, traits::ImageSource};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    trainer::{run_training, StartState},
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run. Written to
// <checkpoint_dir>/train_config.json before the first epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub checkpoint_dir: String,
    pub model:          ModelOptions,
    pub epochs:         usize,
    /// Used when no checkpoint is resumed
    pub start_epoch:    usize,
    pub batch_size:     usize,
    pub lr:             f64,
    pub weight_decay:   f64,
    pub workers:        usize,
    pub print_freq:     usize,
    pub lr_step:        usize,
    pub lr_gamma:       f64,
    /// DataLoader shuffle seed
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            model:          ModelOptions::default(),
            epochs:         90,
            start_epoch:    0,
            batch_size:     16,
            lr:             1e-4,
            weight_decay:   1e-4,
            workers:        4,
            print_freq:     1,
            lr_step:        30,
            lr_gamma:       0.1,
            seed:           42,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    /// Returns the best validation accuracy reached.
    pub fn execute(&self) -> Result<f64> {
        let cfg = &self.config;
        let data_dir = Path::new(&cfg.data_dir);

        // ── Steps 1–2: Scan both splits and check their classes ──────────────
        let (train_classes, train_items) = load_split(&data_dir.join("train"))?;
        let (val_classes, val_items)     = load_split(&data_dir.join("val"))?;
        if train_items.is_empty() {
            bail!("No training images found under '{}'", data_dir.join("train").display());
        }
        if train_classes != val_classes {
            tracing::warn!(
                "Class folders differ between train {:?} and val {:?}",
                train_classes.classes(),
                val_classes.classes()
            );
        }
        tracing::info!("Split: {} train, {} validation", train_items.len(), val_items.len());

        // ── Step 3: Build Burn datasets ───────────────────────────────────────
        let train_dataset = EmotionDataset::new(train_items, Transform::Train);
        let val_dataset   = EmotionDataset::new(val_items, Transform::Eval);

        // ── Step 4: Save config next to the checkpoints ───────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        tracing::info!(
            "Checkpoints in '{}', metrics in '{}'",
            ckpt_manager.dir().display(),
            metrics.csv_path().display()
        );

        // ── Step 5: Build the model, resuming if asked ────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        let (model, meta) = prepare_model::<TrainBackend>(&cfg.model, &device)?;
        let start = start_state(cfg, meta.map(|m| (m.epoch, m.best_prec1)));
        if start.epoch >= cfg.epochs {
            tracing::warn!("Start epoch {} is not below --epochs {}; nothing to train", start.epoch, cfg.epochs);
        }

        // ── Step 6: Epoch loop (Layer 5) ──────────────────────────────────────
        run_training(
            cfg,
            cfg.model.arch,
            model,
            start,
            train_dataset,
            val_dataset,
            &ckpt_manager,
            &metrics,
        )
    }
}

/// Scan one split directory and require the seven emotion classes
fn load_split(root: &Path) -> Result<(ClassMap, Vec<LabelledImage>)> {
    let folder  = ImageFolder::new(PathBuf::from(root));
    let classes = folder.class_map()?;
    classes.ensure_emotion_count()?;
    let items = folder.load_all()?;
    Ok((classes, items))
}

/// A resumed checkpoint overrides `--start-epoch` and carries its best accuracy
fn start_state(cfg: &TrainConfig, resumed: Option<(usize, f64)>) -> StartState {
    match resumed {
        Some((epoch, best_prec1)) => StartState { epoch, best_prec1 },
        None => StartState { epoch: cfg.start_epoch, best_prec1: 0.0 },
    }
}
