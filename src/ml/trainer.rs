// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop using Burn's DataLoader and Adam:
//
//   for epoch in start_epoch..epochs:
//     lr = base_lr × gamma^(epoch / lr_step)
//     train one epoch          (autodiff backend)
//     validate                 (model.valid() → inner backend)
//     checkpoint, copy to model_best if accuracy improved
//     append a metrics.csv row
//
// With a frozen pretrained backbone only the new classifier
// parameters carry gradients, so GradientsParams holds just those
// and Adam only ever updates the head.
//
// Per-batch progress lines keep the classic layout:
//   Epoch: [e][i/n]  Time …  Data …  Loss …  Accuracy …
//   TrainVal: [i/n]  Time …  Loss …  Accuracy …
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{sync::Arc, time::Instant};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::EmotionDataset,
};
use crate::domain::arch::Arch;
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    metrics::{EpochMetrics, MetricsLogger, PassMeters},
};
use crate::ml::{accuracy::accuracy, model::ResNet, InferBackend, TrainBackend};

/// Where a (possibly resumed) run starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartState {
    pub epoch:      usize,
    pub best_prec1: f64,
}

/// Averages over one pass of a DataLoader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSummary {
    pub loss:     f64,
    /// Top-1 accuracy in percent
    pub accuracy: f64,
}

/// Initial learning rate decayed by `gamma` every `step` epochs
pub fn step_decay_lr(base_lr: f64, epoch: usize, step: usize, gamma: f64) -> f64 {
    base_lr * gamma.powi((epoch / step.max(1)) as i32)
}

fn num_batches(items: usize, batch_size: usize) -> usize {
    items.div_ceil(batch_size.max(1))
}

/// Adam with L2 weight decay; burn takes the decay as `f32`
pub fn adam_config(weight_decay: f64) -> AdamConfig {
    AdamConfig::new().with_weight_decay(Some(WeightDecayConfig::new(weight_decay as f32)))
}

/// A Dataset item that fails to load ends the DataLoader iteration
/// early, so a pass that saw fewer samples than the loader holds
/// is an error.
fn ensure_full_pass(pass: &str, seen: usize, expected: usize) -> Result<()> {
    if seen < expected {
        bail!(
            "{pass} pass stopped after {seen} of {expected} images; an image failed to load (see the error above)"
        );
    }
    Ok(())
}

pub fn build_val_loader<B: Backend>(
    dataset:    EmotionDataset,
    batch_size: usize,
    workers:    usize,
    device:     B::Device,
) -> Arc<dyn DataLoader<ImageBatch<B>>> {
    DataLoaderBuilder::new(ImageBatcher::<B>::new(device))
        .batch_size(batch_size)
        .num_workers(workers.max(1))
        .build(dataset)
}

#[allow(clippy::too_many_arguments)]
pub fn run_training(
    cfg:           &TrainConfig,
    arch:          Arch,
    model:         ResNet<TrainBackend>,
    start:         StartState,
    train_dataset: EmotionDataset,
    val_dataset:   EmotionDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<f64> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    // ── Adam with L2 weight decay ─────────────────────────────────────────────
    let mut optim = adam_config(cfg.weight_decay).init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<TrainBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.workers.max(1))
        .build(train_dataset);

    // ── Validation data loader (inner backend) ────────────────────────────────
    let val_loader = build_val_loader::<InferBackend>(val_dataset, cfg.batch_size, cfg.workers, device);

    let mut model      = model;
    let mut best_prec1 = start.best_prec1;
    let mut meters     = PassMeters::new();

    for epoch in start.epoch..cfg.epochs {
        let lr = step_decay_lr(cfg.lr, epoch, cfg.lr_step, cfg.lr_gamma);
        tracing::debug!("Epoch {} learning rate {:e}", epoch, lr);

        let (trained, train) = train_epoch(
            model, &mut optim, train_loader.as_ref(), &mut meters, lr, epoch, cfg.batch_size, cfg.print_freq,
        )?;
        model = trained;

        let val = validate(&model.valid(), val_loader.as_ref(), &mut meters, cfg.batch_size, cfg.print_freq)?;

        // ── Remember best accuracy and checkpoint ─────────────────────────────
        let row = EpochMetrics {
            epoch:      epoch + 1,
            lr,
            train_loss: train.loss,
            train_acc:  train.accuracy,
            val_loss:   val.loss,
            val_acc:    val.accuracy,
        };
        let is_best = row.is_improvement(best_prec1);
        best_prec1  = best_prec1.max(val.accuracy);

        let meta = CheckpointMeta { epoch: epoch + 1, arch, best_prec1 };
        ckpt_manager.save(&model, &meta, is_best)?;
        metrics.log(&row)?;

        println!(
            "Epoch {:>3}/{} | lr={:.2e} | train_loss={:.4} | train_acc={:.2}% | val_loss={:.4} | val_acc={:.2}% | best={:.2}%",
            epoch + 1, cfg.epochs, lr, train.loss, train.accuracy, val.loss, val.accuracy, best_prec1,
        );
    }

    tracing::info!("Training complete! Best accuracy {:.3}", best_prec1);
    Ok(best_prec1)
}

/// One pass over the training set. Returns the updated model.
#[allow(clippy::too_many_arguments)]
pub fn train_epoch<B, O>(
    mut model:  ResNet<B>,
    optim:      &mut O,
    loader:     &dyn DataLoader<ImageBatch<B>>,
    meters:     &mut PassMeters,
    lr:         f64,
    epoch:      usize,
    batch_size: usize,
    print_freq: usize,
) -> Result<(ResNet<B>, PassSummary)>
where
    B: AutodiffBackend,
    O: Optimizer<ResNet<B>, B>,
{
    meters.reset();
    let PassMeters { batch_time, data_time, losses, acc } = meters;

    let total = num_batches(loader.num_items(), batch_size);
    let mut end = Instant::now();

    for (i, batch) in loader.iter().enumerate() {
        data_time.update(end.elapsed().as_secs_f64(), 1);
        let n = batch.targets.dims()[0];

        let output = model.forward_classification(batch.images, batch.targets);

        let loss_val: f64 = output.loss.clone().into_scalar().elem::<f64>();
        let prec1 = accuracy(output.output.clone(), output.targets.clone(), &[1])?[0];
        losses.update(loss_val, n);
        acc.update(prec1, n);

        // Backward pass + Adam update
        let grads = output.loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(lr, model, grads);

        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if i % print_freq.max(1) == 0 {
            tracing::info!(
                "Epoch: [{}][{}/{}]\tTime {:.3} ({:.3})\tData {:.3} ({:.3})\tLoss {:.4} ({:.4})\tAccuracy {:.3} ({:.3})",
                epoch, i, total,
                batch_time.val, batch_time.avg,
                data_time.val, data_time.avg,
                losses.val, losses.avg,
                acc.val, acc.avg,
            );
        }
    }

    ensure_full_pass("Training", losses.count, loader.num_items())?;
    Ok((model, PassSummary { loss: losses.avg, accuracy: acc.avg }))
}

/// One pass over the validation set without gradients
pub fn validate<B: Backend>(
    model:      &ResNet<B>,
    loader:     &dyn DataLoader<ImageBatch<B>>,
    meters:     &mut PassMeters,
    batch_size: usize,
    print_freq: usize,
) -> Result<PassSummary> {
    meters.reset();
    let PassMeters { batch_time, losses, acc, .. } = meters;

    let total = num_batches(loader.num_items(), batch_size);
    let mut end = Instant::now();

    for (i, batch) in loader.iter().enumerate() {
        let n = batch.targets.dims()[0];
        let output = model.forward_classification(batch.images, batch.targets);

        let loss_val: f64 = output.loss.into_scalar().elem::<f64>();
        let prec1 = accuracy(output.output, output.targets, &[1])?[0];
        losses.update(loss_val, n);
        acc.update(prec1, n);

        batch_time.update(end.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if i % print_freq.max(1) == 0 {
            tracing::info!(
                "TrainVal: [{}/{}]\tTime {:.3} ({:.3})\tLoss {:.4} ({:.4})\tAccuracy {:.3} ({:.3})",
                i, total,
                batch_time.val, batch_time.avg,
                losses.val, losses.avg,
                acc.val, acc.avg,
            );
        }
    }

    ensure_full_pass("Validation", losses.count, loader.num_items())?;
    tracing::info!(" * Accuracy {:.3}", acc.avg);
    Ok(PassSummary { loss: losses.avg, accuracy: acc.avg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{dataset::ImageSample, transform::Transform};
    use crate::domain::emotion::NUM_EMOTIONS;
    use crate::ml::model::ResNetConfig;
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataset::{Dataset, InMemDataset},
    };

    /// Reports two items but fails to load the second, like a file
    /// whose body is corrupt
    struct BrokenSecondItem(Vec<ImageSample>);

    impl Dataset<ImageSample> for BrokenSecondItem {
        fn get(&self, index: usize) -> Option<ImageSample> {
            if index == 1 { None } else { self.0.get(index).cloned() }
        }

        fn len(&self) -> usize {
            self.0.len()
        }
    }

    #[test]
    fn test_step_decay_lr() {
        let lr = |epoch| step_decay_lr(1e-4, epoch, 30, 0.1);
        assert_eq!(lr(0), 1e-4);
        assert_eq!(lr(29), 1e-4);
        assert!((lr(30) - 1e-5).abs() < 1e-18);
        assert!((lr(59) - 1e-5).abs() < 1e-18);
        assert!((lr(60) - 1e-6).abs() < 1e-18);
        assert!((lr(90) - 1e-7).abs() < 1e-18);
    }

    #[test]
    fn test_zero_step_does_not_divide_by_zero() {
        assert!((step_decay_lr(1.0, 2, 0, 0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_num_batches_rounds_up() {
        assert_eq!(num_batches(0, 16), 0);
        assert_eq!(num_batches(16, 16), 1);
        assert_eq!(num_batches(17, 16), 2);
    }

    fn tiny_samples() -> Vec<ImageSample> {
        (0..2)
            .map(|label| ImageSample { pixels: vec![0.1 * label as f32; Transform::output_len()], label })
            .collect()
    }

    #[test]
    fn test_train_epoch_updates_only_unfrozen_head() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let model: ResNet<B> = ResNetConfig::new(Arch::Resnet18, 1000)
            .init(&device)
            .no_grad()
            .with_new_head(NUM_EMOTIONS, &device);
        let conv_before = model.conv1.weight.val().into_data();
        let bias_before = model.fc.bias.as_ref().unwrap().val().into_data();

        let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device))
            .batch_size(2)
            .build(InMemDataset::new(tiny_samples()));
        let mut optim = adam_config(TrainConfig::default().weight_decay).init();

        let (model, summary) = train_epoch(model, &mut optim, loader.as_ref(), &mut PassMeters::new(), 1e-2, 0, 2, 1).unwrap();
        assert!(summary.loss.is_finite());
        assert_eq!(model.conv1.weight.val().into_data(), conv_before);
        assert_ne!(model.fc.bias.as_ref().unwrap().val().into_data(), bias_before);
    }

    #[test]
    fn test_validate_reports_percent_accuracy() {
        let device = Default::default();
        let model: ResNet<NdArray> = ResNetConfig::new(Arch::Resnet18, NUM_EMOTIONS).init(&device);
        let loader = DataLoaderBuilder::new(ImageBatcher::<NdArray>::new(device))
            .batch_size(1)
            .build(InMemDataset::new(tiny_samples()));

        let mut meters = PassMeters::new();
        meters.losses.update(99.0, 10);

        let summary = validate(&model, loader.as_ref(), &mut meters, 1, 1).unwrap();
        assert!(summary.loss.is_finite());
        assert!([0.0, 50.0, 100.0].contains(&summary.accuracy));
        // Meters are reset per pass, so stale counts do not leak in
        assert_eq!(meters.losses.count, 2);
    }

    #[test]
    fn test_validate_rejects_a_pass_cut_short_by_a_bad_image() {
        let device = Default::default();
        let model: ResNet<NdArray> = ResNetConfig::new(Arch::Resnet18, NUM_EMOTIONS).init(&device);
        let loader = DataLoaderBuilder::new(ImageBatcher::<NdArray>::new(device))
            .batch_size(1)
            .build(BrokenSecondItem(tiny_samples()));

        let err = validate(&model, loader.as_ref(), &mut PassMeters::new(), 1, 1).unwrap_err();
        assert!(err.to_string().contains("1 of 2 images"));
    }

    #[test]
    fn test_train_epoch_rejects_a_pass_cut_short_by_a_bad_image() {
        type B = Autodiff<NdArray>;
        let device = Default::default();
        let model: ResNet<B> = ResNetConfig::new(Arch::Resnet18, NUM_EMOTIONS).init(&device);
        let loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device))
            .batch_size(1)
            .build(BrokenSecondItem(tiny_samples()));
        let mut optim = AdamConfig::new().init();

        let result = train_epoch(model, &mut optim, loader.as_ref(), &mut PassMeters::new(), 1e-3, 0, 1, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_ensure_full_pass() {
        assert!(ensure_full_pass("Validation", 4, 4).is_ok());
        assert!(ensure_full_pass("Validation", 1, 4).is_err());
    }
}
