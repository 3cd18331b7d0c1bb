// ============================================================
// Layer 5 — ResNet Backbone
// ============================================================
// The torchvision ResNet family assembled from Burn's nn layers.
// Field names mirror torchvision's state-dict keys (conv1, bn1,
// layer1.0.conv1, ..., fc) so pretrained `.pth` files load with
// only the `downsample.{0,1}` keys remapped (see transfer.rs).
//
//   stem:   7x7 conv (stride 2) → BN → ReLU → 3x3 max pool (stride 2)
//   stages: layer1..layer4 of residual blocks, widths 64/128/256/512
//   head:   global average pool → Linear(feature_dim, num_classes)
//
// Basic blocks (resnet18/34) use two 3x3 convs; bottleneck blocks
// (resnet50/101/152) use 1x1 → 3x3 → 1x1 with a 4x expansion and
// put the stride on the 3x3 conv.
//
// Reference: He et al. (2016) Deep Residual Learning
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    train::ClassificationOutput,
};

use crate::domain::arch::{Arch, BlockKind};

/// Channel width of each stage before expansion
const STAGE_PLANES: [usize; 4] = [64, 128, 256, 512];
/// Stride of the first block of each stage
const STAGE_STRIDES: [usize; 4] = [1, 2, 2, 2];

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub arch:        Arch,
    pub num_classes: usize,
}

impl ResNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let kind      = self.arch.block_kind();
        let depths    = self.arch.stage_depths();
        let mut in_ch = 64;

        let mut stage = |index: usize| -> Vec<ResidualBlock<B>> {
            let planes = STAGE_PLANES[index];
            (0..depths[index])
                .map(|i| {
                    let stride = if i == 0 { STAGE_STRIDES[index] } else { 1 };
                    let block  = BlockConfig { kind, in_ch, planes, stride }.init(device);
                    in_ch = planes * kind.expansion();
                    block
                })
                .collect()
        };
        let layer1 = stage(0);
        let layer2 = stage(1);
        let layer3 = stage(2);
        let layer4 = stage(3);

        ResNet {
            conv1: Conv2dConfig::new([3, 64], [7, 7])
                .with_stride([2, 2])
                .with_padding(PaddingConfig2d::Explicit(3, 3))
                .with_bias(false)
                .init(device),
            bn1:     BatchNormConfig::new(64).init(device),
            relu:    Relu::new(),
            maxpool: MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(),
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc:      LinearConfig::new(self.arch.feature_dim(), self.num_classes).init(device),
        }
    }
}

// ─── ResNet ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub bn1:     BatchNorm<B, 2>,
    pub relu:    Relu,
    pub maxpool: MaxPool2d,
    pub layer1:  Vec<ResidualBlock<B>>,
    pub layer2:  Vec<ResidualBlock<B>>,
    pub layer3:  Vec<ResidualBlock<B>>,
    pub layer4:  Vec<ResidualBlock<B>>,
    pub avgpool: AdaptiveAvgPool2d,
    pub fc:      Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.features(images);
        self.fc.forward(x)
    }

    /// Pooled backbone features: [batch, feature_dim]
    pub fn features(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images);
        let x = self.bn1.forward(x);
        let x = self.relu.forward(x);
        let mut x = self.maxpool.forward(x);

        for stage in [&self.layer1, &self.layer2, &self.layer3, &self.layer4] {
            for block in stage {
                x = block.forward(x);
            }
        }

        let x = self.avgpool.forward(x);
        x.flatten(1, 3)
    }

    /// Forward pass plus cross-entropy against `targets`
    pub fn forward_classification(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }

    /// Input width of the classifier layer
    pub fn feature_dim(&self) -> usize {
        self.fc.weight.val().dims()[0]
    }

    /// Output width of the classifier layer
    pub fn num_classes(&self) -> usize {
        self.fc.weight.val().dims()[1]
    }

    /// Swap the classifier for a freshly initialised one with
    /// `num_classes` outputs. Backbone parameters are untouched.
    pub fn with_new_head(self, num_classes: usize, device: &B::Device) -> Self {
        let fc = LinearConfig::new(self.feature_dim(), num_classes).init(device);
        Self { fc, ..self }
    }
}

// ─── Residual block ───────────────────────────────────────────────────────────
struct BlockConfig {
    kind:   BlockKind,
    in_ch:  usize,
    planes: usize,
    stride: usize,
}

impl BlockConfig {
    fn init<B: Backend>(&self, device: &B::Device) -> ResidualBlock<B> {
        let out_ch = self.planes * self.kind.expansion();
        let stride = [self.stride, self.stride];

        let downsample = (self.stride != 1 || self.in_ch != out_ch).then(|| Downsample {
            conv: Conv2dConfig::new([self.in_ch, out_ch], [1, 1])
                .with_stride(stride)
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_ch).init(device),
        });

        match self.kind {
            BlockKind::Basic => ResidualBlock {
                conv1: conv3x3(self.in_ch, self.planes, stride, device),
                bn1:   BatchNormConfig::new(self.planes).init(device),
                conv2: conv3x3(self.planes, self.planes, [1, 1], device),
                bn2:   BatchNormConfig::new(self.planes).init(device),
                conv3: None,
                bn3:   None,
                downsample,
                relu:  Relu::new(),
            },
            BlockKind::Bottleneck => ResidualBlock {
                conv1: conv1x1(self.in_ch, self.planes, device),
                bn1:   BatchNormConfig::new(self.planes).init(device),
                conv2: conv3x3(self.planes, self.planes, stride, device),
                bn2:   BatchNormConfig::new(self.planes).init(device),
                conv3: Some(conv1x1(self.planes, out_ch, device)),
                bn3:   Some(BatchNormConfig::new(out_ch).init(device)),
                downsample,
                relu:  Relu::new(),
            },
        }
    }
}

fn conv3x3<B: Backend>(in_ch: usize, out_ch: usize, stride: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_ch, out_ch], [3, 3])
        .with_stride(stride)
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

fn conv1x1<B: Backend>(in_ch: usize, out_ch: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_ch, out_ch], [1, 1])
        .with_bias(false)
        .init(device)
}

/// Basic or bottleneck residual block. `conv3`/`bn3` are only
/// present for bottleneck blocks.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub bn1:        BatchNorm<B, 2>,
    pub conv2:      Conv2d<B>,
    pub bn2:        BatchNorm<B, 2>,
    pub conv3:      Option<Conv2d<B>>,
    pub bn3:        Option<BatchNorm<B, 2>>,
    pub downsample: Option<Downsample<B>>,
    pub relu:       Relu,
}

impl<B: Backend> ResidualBlock<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(ds) => ds.forward(x.clone()),
            None     => x.clone(),
        };

        let out = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));
        let out = match (&self.conv3, &self.bn3) {
            (Some(conv3), Some(bn3)) => bn3.forward(conv3.forward(self.relu.forward(out))),
            _ => out,
        };

        self.relu.forward(out + identity)
    }
}

/// 1x1 projection on the shortcut path when shape changes
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}
