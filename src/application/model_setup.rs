// ============================================================
// Layer 2 — Model Setup
// ============================================================
// Shared by every workflow: build the backbone (optionally from
// torchvision weights with a fresh 7-way head), then restore a
// checkpoint on top of it when --resume was given.

use anyhow::Result;
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::arch::Arch;
use crate::infra::checkpoint::{load_checkpoint, CheckpointMeta};
use crate::ml::{model::ResNet, transfer::build_model};

/// Which network to build and where its weights come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub arch:       Arch,
    /// torchvision `.pth` state dict for `arch`
    pub pretrained: Option<String>,
    /// Checkpoint written by a previous `train` run
    pub resume:     Option<String>,
}

pub fn prepare_model<B: Backend>(
    opts:   &ModelOptions,
    device: &B::Device,
) -> Result<(ResNet<B>, Option<CheckpointMeta>)> {
    let model = build_model::<B>(opts.arch, opts.pretrained.as_deref().map(Path::new), device)?;

    match opts.resume.as_deref() {
        Some(path) if !path.is_empty() => load_checkpoint(model, Path::new(path), opts.arch, device),
        _ => Ok((model, None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::emotion::NUM_EMOTIONS;
    use crate::infra::checkpoint::CheckpointManager;
    use burn::backend::NdArray;

    type B = NdArray;

    fn opts(resume: Option<String>) -> ModelOptions {
        ModelOptions { arch: Arch::Resnet18, pretrained: None, resume }
    }

    #[test]
    fn test_fresh_model_has_emotion_head() {
        let device = Default::default();
        let (model, meta) = prepare_model::<B>(&opts(None), &device).unwrap();
        assert_eq!(model.num_classes(), NUM_EMOTIONS);
        assert!(meta.is_none());
    }

    #[test]
    fn test_missing_resume_is_ignored() {
        let device = Default::default();
        let (_, meta) = prepare_model::<B>(&opts(Some("does/not/exist.json".into())), &device).unwrap();
        assert!(meta.is_none());
    }

    #[test]
    fn test_resume_restores_meta() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let (model, _) = prepare_model::<B>(&opts(None), &device).unwrap();

        let manager = CheckpointManager::new(dir.path()).unwrap();
        let saved = CheckpointMeta { epoch: 3, arch: Arch::Resnet18, best_prec1: 42.5 };
        manager.save(&model, &saved, false).unwrap();

        let resume = manager.latest_stem().to_string_lossy().into_owned();
        let (_, meta) = prepare_model::<B>(&opts(Some(resume)), &device).unwrap();
        assert_eq!(meta, Some(saved));
    }

    #[test]
    fn test_resume_with_other_arch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let (model, _) = prepare_model::<B>(&opts(None), &device).unwrap();

        let manager = CheckpointManager::new(dir.path()).unwrap();
        let saved = CheckpointMeta { epoch: 1, arch: Arch::Resnet34, best_prec1: 0.0 };
        manager.save(&model, &saved, false).unwrap();

        let resume = manager.latest_stem().to_string_lossy().into_owned();
        assert!(prepare_model::<B>(&opts(Some(resume)), &device).is_err());
    }
}
