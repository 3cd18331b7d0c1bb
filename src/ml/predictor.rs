// ============================================================
// Layer 5 — Predictor
// ============================================================
// Runs a trained model on one transformed image at a time and
// returns the softmax distribution over the model's outputs
// (in class-folder order, not yet in CSV emotion order).

use anyhow::{anyhow, ensure, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::{batcher::ImageBatcher, transform::Transform};
use crate::ml::model::ResNet;

pub struct Predictor<B: Backend> {
    model:   ResNet<B>,
    batcher: ImageBatcher<B>,
}

impl<B: Backend> Predictor<B> {
    pub fn new(model: ResNet<B>, device: B::Device) -> Self {
        Self { model, batcher: ImageBatcher::new(device) }
    }

    /// Class probabilities for one CHW pixel vector
    pub fn predict(&self, pixels: &[f32]) -> Result<Vec<f32>> {
        ensure!(
            pixels.len() == Transform::output_len(),
            "Expected {} pixel values, got {}",
            Transform::output_len(),
            pixels.len()
        );
        let images = self.batcher.images(vec![pixels]);
        let logits = self.model.forward(images);
        softmax(logits, 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))
    }
}
