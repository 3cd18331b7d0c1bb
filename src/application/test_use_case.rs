// ============================================================
// Layer 2 — TestUseCase
// ============================================================
// Predicts every image under <data>/test/<Subject>/ and writes
//
//   <data>/entry.csv   one row per image  (id = file path)
//   <data>/entry2.csv  one row per subject (mean of its images)
//
// Probabilities are re-ordered from class-folder order (taken
// from <data>/train) into the fixed emotion column order.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

use crate::application::model_setup::{prepare_model, ModelOptions};
use crate::data::{dataset::load_pixels, folder::{ImageFolder, TestImageFolder}, transform::Transform};
use crate::domain::{
    class_map::ClassMap,
    image::UnlabelledImage,
    prediction::{ImagePrediction, SubjectAggregator},
    traits::{ImageSource, PredictionSink},
};
use crate::infra::prediction_csv::ProbabilityCsv;
use crate::ml::{predictor::Predictor, InferBackend};

pub const IMAGE_CSV:   &str = "entry.csv";
pub const SUBJECT_CSV: &str = "entry2.csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestConfig {
    pub data_dir: String,
    pub model:    ModelOptions,
}

/// Row counts of the two CSVs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSummary {
    pub images:   usize,
    pub subjects: usize,
}

pub struct TestUseCase {
    config: TestConfig,
}

impl TestUseCase {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TestSummary> {
        let data_dir = Path::new(&self.config.data_dir);

        let class_map = ImageFolder::new(data_dir.join("train")).class_map()?;
        // Fail before any prediction if an emotion folder is missing
        class_map.emotion_columns()?;

        let images = TestImageFolder::new(data_dir.join("test")).load_all()?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        let (model, _) = prepare_model::<InferBackend>(&self.config.model, &device)?;
        let predictor = Predictor::new(model, device);

        let predictions = collect_predictions(&images, &class_map, |pixels| predictor.predict(pixels))?;
        write_outputs(&predictions, data_dir)
    }
}

/// Run `predict` on each test image in order
pub fn collect_predictions<F>(
    images:    &[UnlabelledImage],
    class_map: &ClassMap,
    mut predict: F,
) -> Result<Vec<ImagePrediction>>
where
    F: FnMut(&[f32]) -> Result<Vec<f32>>,
{
    let mut out = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let pixels = load_pixels(&image.path, Transform::Eval)?;
        let probs  = class_map.reorder(&predict(&pixels)?)?;
        tracing::debug!("[{}/{}] {} {:?}", i + 1, images.len(), image.id(), probs);
        out.push(ImagePrediction::new(image.id(), probs));
    }
    Ok(out)
}

/// Write the per-image and per-subject CSVs into `dir`
pub fn write_outputs(predictions: &[ImagePrediction], dir: &Path) -> Result<TestSummary> {
    let per_image: BTreeMap<_, _> = predictions
        .iter()
        .map(|p| (p.id.clone(), p.probs))
        .collect();

    let mut aggregator = SubjectAggregator::new();
    for p in predictions {
        if let Some(group) = aggregator.push(p) {
            log_group(&group.subject, &group.mean, group.merged);
        }
    }
    let (per_subject, last) = aggregator.finish();
    if let Some(group) = last {
        log_group(&group.subject, &group.mean, group.merged);
    }

    ProbabilityCsv::new(dir.join(IMAGE_CSV)).write_all(&per_image)?;
    ProbabilityCsv::new(dir.join(SUBJECT_CSV)).write_all(&per_subject)?;
    tracing::info!(
        "Wrote {} image rows to {} and {} subject rows to {}",
        per_image.len(),
        IMAGE_CSV,
        per_subject.len(),
        SUBJECT_CSV
    );

    Ok(TestSummary { images: per_image.len(), subjects: per_subject.len() })
}

fn log_group(subject: &str, mean: &[f32], merged: bool) {
    if merged {
        tracing::warn!("Subject {} appeared again after another subject; merging its images", subject);
    }
    tracing::info!("{} {:?}", subject, mean);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::emotion::{Emotion, NUM_EMOTIONS};
    use std::fs;

    fn emotion_map() -> ClassMap {
        ClassMap::new(Emotion::ALL.iter().map(|e| e.name().to_string()).collect())
    }

    fn read(path: &Path) -> Vec<String> {
        fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn test_collect_predictions_reorders_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut images = Vec::new();
        for name in ["s1_a.jpg", "s1_b.jpg"] {
            let path = dir.path().join(name);
            image::RgbImage::new(8, 8).save(&path).unwrap();
            images.push(UnlabelledImage { path });
        }
        // An extra folder sorting first shifts every emotion one column right
        let class_map = ClassMap::new(
            ["Surprise", "Angry", "Contempt", "Disgust", "Fear", "Happy", "Neutral", "Sad"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        let mut calls = 0;
        let preds = collect_predictions(&images, &class_map, |pixels| {
            assert_eq!(pixels.len(), Transform::output_len());
            calls += 1;
            Ok(vec![0.5, 0.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.4])
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(preds[0].id, images[0].id());
        // Sorted folders: Angry, Contempt, Disgust, ..., Surprise
        assert_eq!(preds[0].probs[0], 0.5);
        assert_eq!(preds[0].probs[1], 0.1);
        assert_eq!(preds[0].probs[NUM_EMOTIONS - 1], 0.4);
    }

    #[test]
    fn test_collect_predictions_propagates_decode_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1_a.jpg");
        fs::write(&path, b"not an image").unwrap();

        let result = collect_predictions(&[UnlabelledImage { path }], &emotion_map(), |_| {
            Ok(vec![1.0 / NUM_EMOTIONS as f32; NUM_EMOTIONS])
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_write_outputs_groups_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let predictions = vec![
            ImagePrediction::new("test/s2/s2_1.jpg", [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            ImagePrediction::new("test/s2/s2_2.jpg", [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            ImagePrediction::new("test/s1/s1_1.jpg", [0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
        ];

        let summary = write_outputs(&predictions, dir.path()).unwrap();
        assert_eq!(summary, TestSummary { images: 3, subjects: 2 });

        let images = read(&dir.path().join(IMAGE_CSV));
        assert_eq!(images[0], "id,Angry,Disgust,Fear,Happy,Neutral,Sad,Surprise");
        assert!(images[1].starts_with("test/s1/s1_1.jpg,"));

        let subjects = read(&dir.path().join(SUBJECT_CSV));
        assert_eq!(subjects.len(), 3);
        assert_eq!(subjects[1], "s1,0,0,1,0,0,0,0");
        assert_eq!(subjects[2], "s2,0.5,0.5,0,0,0,0,0");
    }

    #[test]
    fn test_write_outputs_empty_test_set() {
        let dir = tempfile::tempdir().unwrap();
        let summary = write_outputs(&[], dir.path()).unwrap();
        assert_eq!(summary, TestSummary { images: 0, subjects: 0 });
        assert_eq!(read(&dir.path().join(SUBJECT_CSV)).len(), 1);
    }
}
