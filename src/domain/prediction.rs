// ============================================================
// Layer 3 — Predictions and Subject Grouping
// ============================================================
// Test images are named `<subject>_<anything>.jpg`. After the
// per-image probabilities are computed, images of the same
// subject are averaged into one row.
//
// Grouping walks the predictions in order and closes a group
// whenever the subject id changes, so the input must be sorted
// (TestImageFolder guarantees that). A subject that shows up
// again after another subject's run is folded into its earlier
// group rather than replacing it.

use std::collections::BTreeMap;

use crate::domain::emotion::NUM_EMOTIONS;

/// Softmax output for one test image, in CSV emotion order
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrediction {
    pub id:    String,
    pub probs: [f32; NUM_EMOTIONS],
}

impl ImagePrediction {
    pub fn new(id: impl Into<String>, probs: [f32; NUM_EMOTIONS]) -> Self {
        Self { id: id.into(), probs }
    }

    pub fn subject_id(&self) -> &str {
        subject_id(&self.id)
    }
}

/// Subject id of an image path: the file name up to the first `_`.
///
///   "data/test/x/s042_003.jpg" → "s042"
///   "data/test/x/s042.jpg"     → "s042.jpg"
pub fn subject_id(path: &str) -> &str {
    let file_name = path.trim().rsplit(['/', '\\']).next().unwrap_or("");
    file_name.split('_').next().unwrap_or(file_name)
}

/// Sum and count of one subject's probabilities
#[derive(Debug, Clone)]
struct Accumulated {
    sum:   [f64; NUM_EMOTIONS],
    count: usize,
}

impl Accumulated {
    fn new() -> Self {
        Self { sum: [0.0; NUM_EMOTIONS], count: 0 }
    }

    fn add(&mut self, probs: &[f32; NUM_EMOTIONS]) {
        for (s, p) in self.sum.iter_mut().zip(probs) {
            *s += *p as f64;
        }
        self.count += 1;
    }

    fn merge(&mut self, other: &Accumulated) {
        for (s, o) in self.sum.iter_mut().zip(other.sum) {
            *s += o;
        }
        self.count += other.count;
    }

    fn mean(&self) -> [f32; NUM_EMOTIONS] {
        let mut out = [0.0f32; NUM_EMOTIONS];
        if self.count == 0 {
            return out;
        }
        for (o, s) in out.iter_mut().zip(self.sum) {
            *o = (s / self.count as f64) as f32;
        }
        out
    }
}

/// One finished run of consecutive images from a single subject
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedGroup {
    pub subject: String,
    pub mean:    [f32; NUM_EMOTIONS],
    pub count:   usize,
    /// True when this subject already had an earlier run
    pub merged:  bool,
}

/// Streaming per-subject averager.
#[derive(Debug, Default)]
pub struct SubjectAggregator {
    current:  Option<(String, Accumulated)>,
    finished: BTreeMap<String, Accumulated>,
}

impl SubjectAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next prediction. Returns the group that was closed
    /// if this prediction starts a new subject.
    pub fn push(&mut self, prediction: &ImagePrediction) -> Option<ClosedGroup> {
        let subject = prediction.subject_id();

        if let Some((current, acc)) = self.current.as_mut() {
            if current == subject {
                acc.add(&prediction.probs);
                return None;
            }
        }

        let closed = self.close_current();
        let mut acc = Accumulated::new();
        acc.add(&prediction.probs);
        self.current = Some((subject.to_string(), acc));
        closed
    }

    /// Close the trailing group and return subject → mean probabilities
    /// plus the last closed group (if any).
    pub fn finish(mut self) -> (BTreeMap<String, [f32; NUM_EMOTIONS]>, Option<ClosedGroup>) {
        let last = self.close_current();
        let means = self
            .finished
            .iter()
            .map(|(subject, acc)| (subject.clone(), acc.mean()))
            .collect();
        (means, last)
    }

    fn close_current(&mut self) -> Option<ClosedGroup> {
        let (subject, acc) = self.current.take()?;
        let merged = self.finished.contains_key(&subject);
        let total = self
            .finished
            .entry(subject.clone())
            .or_insert_with(Accumulated::new);
        total.merge(&acc);
        Some(ClosedGroup {
            mean:  total.mean(),
            count: total.count,
            subject,
            merged,
        })
    }
}
