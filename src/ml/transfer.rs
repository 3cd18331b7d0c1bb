// ============================================================
// Layer 5 — Transfer Learning Setup
// ============================================================
// Builds the network for a run:
//
//   with pretrained weights:
//     1. build the 1000-class ImageNet ResNet
//     2. load torchvision weights from a `.pth` file
//     3. freeze every parameter (no gradients)
//     4. replace `fc` with a fresh 7-way Linear layer
//        → only the new head is trained
//
//   without pretrained weights:
//     build a 7-way ResNet from random initialisation,
//     every parameter trainable
//
// The `.pth` file is read with burn-import's PyTorchFileRecorder.
// torchvision stores the shortcut projection as a Sequential
// (`downsample.0` conv, `downsample.1` bn); our Downsample module
// names those fields `conv` and `bn`.
//
// Reference: Burn Book §7 (Importing PyTorch models)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use std::path::Path;

use crate::domain::{arch::Arch, emotion::NUM_EMOTIONS};
use crate::ml::model::{ResNet, ResNetConfig, ResNetRecord};

/// Classifier width of torchvision's ImageNet checkpoints
pub const IMAGENET_CLASSES: usize = 1000;

pub fn build_model<B: Backend>(
    arch:       Arch,
    pretrained: Option<&Path>,
    device:     &B::Device,
) -> Result<ResNet<B>> {
    let model = match pretrained {
        Some(path) => {
            tracing::info!("=> using pre-trained model '{}'", arch);
            let model = ResNetConfig::new(arch, IMAGENET_CLASSES).init::<B>(device);
            let model = load_torchvision_weights(model, path, device)?;
            model.no_grad().with_new_head(NUM_EMOTIONS, device)
        }
        None => {
            tracing::info!("=> creating model '{}'", arch);
            ResNetConfig::new(arch, NUM_EMOTIONS).init::<B>(device)
        }
    };

    tracing::info!(
        "Model ready: {} parameters, classifier {} → {}",
        model.num_params(),
        model.feature_dim(),
        model.num_classes(),
    );
    Ok(model)
}

/// Load a torchvision ResNet state dict into `model`
pub fn load_torchvision_weights<B: Backend>(
    model:  ResNet<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<ResNet<B>> {
    let args = LoadArgs::new(path.to_path_buf())
        .with_key_remap(r"downsample\.0\.(.+)", "downsample.conv.$1")
        .with_key_remap(r"downsample\.1\.(.+)", "downsample.bn.$1");

    let record: ResNetRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .with_context(|| format!("Cannot load pretrained weights from '{}'", path.display()))?;

    tracing::debug!("Loaded pretrained weights from '{}'", path.display());
    Ok(model.load_record(record))
}
