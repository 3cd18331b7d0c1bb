// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training state.
//
// A checkpoint is a pair of files sharing one stem:
//   <stem>.mpk.gz  — model weights (Burn CompactRecorder)
//   <stem>.json    — { epoch, arch, best_prec1 }
//
// Layout of the checkpoint directory:
//   checkpoints/
//     checkpoint.mpk.gz   ← written after every epoch
//     checkpoint.json
//     model_best.mpk.gz   ← copy of the best epoch so far
//     model_best.json
//     train_config.json   ← hyper-parameters of the run
//     metrics.csv         ← see metrics.rs
//
// `epoch` counts completed epochs, so a resumed run starts at
// exactly that epoch index.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::arch::Arch;
use crate::ml::model::ResNet;

/// Stem of the per-epoch checkpoint
pub const CHECKPOINT_NAME: &str = "checkpoint";
/// Stem of the best-so-far checkpoint
pub const BEST_NAME: &str = "model_best";

const MODEL_EXT: &str = "mpk.gz";
const META_EXT: &str = "json";

/// Training progress stored next to the weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Number of completed epochs
    pub epoch:      usize,
    pub arch:       Arch,
    /// Best validation top-1 accuracy seen so far (percent)
    pub best_prec1: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn latest_stem(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_NAME)
    }

    pub fn best_stem(&self) -> PathBuf {
        self.dir.join(BEST_NAME)
    }

    /// Write the epoch checkpoint; copy it to `model_best` when `is_best`
    pub fn save<B: Backend>(&self, model: &ResNet<B>, meta: &CheckpointMeta, is_best: bool) -> Result<()> {
        let stem = self.latest_stem();
        save_checkpoint(model, meta, &stem)?;

        if is_best {
            let best = self.best_stem();
            for ext in [MODEL_EXT, META_EXT] {
                fs::copy(with_ext(&stem, ext), with_ext(&best, ext))
                    .with_context(|| format!("Cannot copy checkpoint to '{}'", best.display()))?;
            }
            tracing::info!("New best accuracy {:.3} at epoch {}", meta.best_prec1, meta.epoch);
        }
        Ok(())
    }

    /// Save the run configuration as pretty JSON
    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

/// Accept `foo/checkpoint`, `foo/checkpoint.json` or `foo/checkpoint.mpk.gz`
pub fn checkpoint_stem(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    for suffix in [".mpk.gz", ".mpk", ".json"] {
        if let Some(stripped) = s.strip_suffix(suffix) {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}

fn with_ext(stem: &Path, ext: &str) -> PathBuf {
    let mut s = OsString::from(stem.as_os_str());
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

pub fn save_checkpoint<B: Backend>(model: &ResNet<B>, meta: &CheckpointMeta, stem: &Path) -> Result<()> {
    CompactRecorder::new()
        .record(model.clone().into_record(), stem.to_path_buf())
        .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;

    let meta_path = with_ext(stem, META_EXT);
    fs::write(&meta_path, serde_json::to_string_pretty(meta)?)
        .with_context(|| format!("Cannot write '{}'", meta_path.display()))?;

    tracing::debug!("Saved checkpoint '{}' (epoch {})", stem.display(), meta.epoch);
    Ok(())
}

/// Read checkpoint metadata. `Ok(None)` if there is no checkpoint at `path`.
pub fn read_meta(path: &Path) -> Result<Option<CheckpointMeta>> {
    let meta_path = with_ext(&checkpoint_stem(path), META_EXT);
    if !meta_path.is_file() {
        return Ok(None);
    }
    let json = fs::read_to_string(&meta_path)
        .with_context(|| format!("Cannot read '{}'", meta_path.display()))?;
    let meta = serde_json::from_str(&json)
        .with_context(|| format!("Malformed checkpoint metadata '{}'", meta_path.display()))?;
    Ok(Some(meta))
}

/// Restore `model` from the checkpoint at `path`.
///
/// A missing checkpoint is not an error: it is logged and `Ok(None)`
/// is returned so the caller continues with the model it has.
pub fn load_checkpoint<B: Backend>(
    model:  ResNet<B>,
    path:   &Path,
    arch:   Arch,
    device: &B::Device,
) -> Result<(ResNet<B>, Option<CheckpointMeta>)> {
    let Some(meta) = read_meta(path)? else {
        tracing::warn!("=> no checkpoint found at '{}'", path.display());
        return Ok((model, None));
    };
    if meta.arch != arch {
        bail!(
            "Checkpoint '{}' was trained with '{}' but '{}' was requested",
            path.display(),
            meta.arch,
            arch
        );
    }

    tracing::info!("=> loading checkpoint '{}'", path.display());
    let stem = checkpoint_stem(path);
    let record = CompactRecorder::new()
        .load(stem.clone(), device)
        .with_context(|| format!("Cannot load checkpoint weights '{}'", stem.display()))?;
    tracing::info!("=> loaded checkpoint '{}' (epoch {})", path.display(), meta.epoch);

    Ok((model.load_record(record), Some(meta)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ResNetConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_checkpoint_stem() {
        assert_eq!(checkpoint_stem(Path::new("c/checkpoint.json")), PathBuf::from("c/checkpoint"));
        assert_eq!(checkpoint_stem(Path::new("c/checkpoint.mpk.gz")), PathBuf::from("c/checkpoint"));
        assert_eq!(checkpoint_stem(Path::new("c/model_best")), PathBuf::from("c/model_best"));
    }

    #[test]
    fn test_missing_checkpoint_is_ignored() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model: ResNet<NdArray> = ResNetConfig::new(Arch::Resnet18, 7).init(&device);
        let (_, meta) = load_checkpoint(model, &tmp.path().join("nothing"), Arch::Resnet18, &device).unwrap();
        assert!(meta.is_none());
    }

    #[test]
    fn test_save_copies_best_and_restores() {
        let tmp     = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(tmp.path().join("ckpt")).unwrap();
        let device  = Default::default();
        let model: ResNet<NdArray> = ResNetConfig::new(Arch::Resnet18, 7).init(&device);

        let meta = CheckpointMeta { epoch: 3, arch: Arch::Resnet18, best_prec1: 41.5 };
        manager.save(&model, &meta, true).unwrap();
        assert!(manager.dir().join("checkpoint.mpk.gz").is_file());
        assert!(manager.dir().join("model_best.mpk.gz").is_file());
        assert_eq!(read_meta(&manager.best_stem()).unwrap(), Some(meta.clone()));

        // A later, worse epoch must not touch model_best
        let worse = CheckpointMeta { epoch: 4, ..meta.clone() };
        manager.save(&model, &worse, false).unwrap();
        assert_eq!(read_meta(&manager.best_stem()).unwrap().unwrap().epoch, 3);
        assert_eq!(read_meta(&manager.latest_stem()).unwrap().unwrap().epoch, 4);

        let fresh: ResNet<NdArray> = ResNetConfig::new(Arch::Resnet18, 7).init(&device);
        let (_, loaded) = load_checkpoint(fresh, &manager.latest_stem(), Arch::Resnet18, &device).unwrap();
        assert_eq!(loaded.unwrap().epoch, 4);
    }

    #[test]
    fn test_arch_mismatch_is_an_error() {
        let tmp    = tempfile::tempdir().unwrap();
        let stem   = tmp.path().join("checkpoint");
        let meta   = CheckpointMeta { epoch: 1, arch: Arch::Resnet50, best_prec1: 0.0 };
        fs::write(with_ext(&stem, META_EXT), serde_json::to_string(&meta).unwrap()).unwrap();

        let device = Default::default();
        let model: ResNet<NdArray> = ResNetConfig::new(Arch::Resnet18, 7).init(&device);
        assert!(load_checkpoint(model, &stem, Arch::Resnet18, &device).is_err());
    }
}
