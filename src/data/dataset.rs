// ============================================================
// Layer 4 — Burn Datasets
// ============================================================
// Wraps the labelled image list from ImageFolder in Burn's
// Dataset trait. Images are decoded and transformed lazily in
// `get`, which the DataLoader calls from its worker threads.
// The test workflow calls `load_pixels` directly instead.
//
// A decode failure at this point is logged and reported as
// `None`. That ends the DataLoader pass early, and the training
// loop rejects the short pass.

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use std::path::Path;

use crate::data::transform::Transform;
use crate::domain::image::LabelledImage;

/// One transformed training / validation image
#[derive(Debug, Clone)]
pub struct ImageSample {
    /// CHW floats, length `Transform::output_len()`
    pub pixels: Vec<f32>,
    pub label:  usize,
}

/// Decode an image file, convert to RGB and run `transform` on it
pub fn load_pixels(path: &Path, transform: Transform) -> Result<Vec<f32>> {
    let img = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
    Ok(transform.apply(img, &mut rand::thread_rng()))
}

// ─── EmotionDataset ───────────────────────────────────────────────────────────
pub struct EmotionDataset {
    items:     Vec<LabelledImage>,
    transform: Transform,
}

impl EmotionDataset {
    pub fn new(items: Vec<LabelledImage>, transform: Transform) -> Self {
        Self { items, transform }
    }
}

impl Dataset<ImageSample> for EmotionDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        let item = self.items.get(index)?;
        match load_pixels(&item.path, self.transform) {
            Ok(pixels) => Some(ImageSample { pixels, label: item.label }),
            Err(e) => {
                tracing::error!("{e:#}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    #[test]
    fn test_get_decodes_and_transforms() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.png");
        RgbImage::from_pixel(50, 40, Rgb([1, 2, 3])).save(&path).unwrap();

        let ds = EmotionDataset::new(
            vec![LabelledImage { path, label: 4 }],
            Transform::Eval,
        );
        assert_eq!(ds.len(), 1);
        let sample = ds.get(0).unwrap();
        assert_eq!(sample.label, 4);
        assert_eq!(sample.pixels.len(), Transform::output_len());
        assert!(ds.get(1).is_none());
    }

    #[test]
    fn test_missing_file_yields_none() {
        let ds = EmotionDataset::new(
            vec![LabelledImage { path: PathBuf::from("/definitely/not/here.png"), label: 0 }],
            Transform::Train,
        );
        assert!(ds.get(0).is_none());
    }
}
