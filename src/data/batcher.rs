// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N transformed images
// into one [N, 3, 224, 224] float tensor and their labels into
// an [N] int tensor on the batcher's device.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::{dataset::ImageSample, transform::CROP_SIZE};

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Normalised pixels — shape: [batch_size, 3, 224, 224]
    pub images: Tensor<B, 4>,
    /// Class indices — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack CHW pixel vectors into a 4D tensor
    pub fn images(&self, pixels: Vec<&[f32]>) -> Tensor<B, 4> {
        let batch_size = pixels.len();
        let side       = CROP_SIZE as usize;
        let flat: Vec<f32> = pixels.into_iter().flatten().copied().collect();

        let data = TensorData::new(flat, [batch_size, 3, side, side]);
        Tensor::<B, 4>::from_data(data.convert::<B::FloatElem>(), &self.device)
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();
        let images = self.images(items.iter().map(|s| s.pixels.as_slice()).collect());

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::transform::Transform;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes() {
        let batcher = ImageBatcher::<NdArray>::new(Default::default());
        let items = vec![
            ImageSample { pixels: vec![0.5; Transform::output_len()], label: 2 },
            ImageSample { pixels: vec![-0.5; Transform::output_len()], label: 6 },
        ];
        let batch = batcher.batch(items);
        assert_eq!(batch.images.dims(), [2, 3, 224, 224]);
        assert_eq!(batch.targets.dims(), [2]);
        let targets: Vec<i64> = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(targets, vec![2, 6]);
    }
}
