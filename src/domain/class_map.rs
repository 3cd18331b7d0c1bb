// ============================================================
// Layer 3 — Class Map
// ============================================================
// Class indices come from the sorted names of the class folders
// (`train/Angry`, `train/Disgust`, ...). The network's output
// column i therefore means "the i-th folder name in sorted order".
//
// When writing predictions we need the opposite direction:
// for each emotion in CSV order, which output column holds it?
// `ClassMap::reorder` does that lookup.

use anyhow::{bail, Result};

use crate::domain::emotion::{Emotion, NUM_EMOTIONS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    /// Folder names, sorted; position = class index
    classes: Vec<String>,
}

impl ClassMap {
    /// Build from folder names in any order; they are sorted here
    pub fn new(mut classes: Vec<String>) -> Self {
        classes.sort();
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }

    /// The classifier head has a fixed width, so every split it
    /// trains or validates on must have exactly that many classes.
    pub fn ensure_emotion_count(&self) -> Result<()> {
        if self.classes.len() != NUM_EMOTIONS {
            bail!(
                "Expected {} class folders, found {}: [{}]",
                NUM_EMOTIONS,
                self.classes.len(),
                self.classes.join(", ")
            );
        }
        Ok(())
    }

    /// Output column of each emotion, in CSV order.
    /// Fails if any emotion has no matching class folder.
    pub fn emotion_columns(&self) -> Result<[usize; NUM_EMOTIONS]> {
        let mut columns = [0usize; NUM_EMOTIONS];
        for (slot, emotion) in columns.iter_mut().zip(Emotion::ALL) {
            *slot = match self.index_of(emotion.name()) {
                Some(i) => i,
                None => bail!(
                    "No class folder named '{}' (found: [{}])",
                    emotion,
                    self.classes.join(", ")
                ),
            };
        }
        Ok(columns)
    }

    /// Pick the softmax outputs out of `probs` in CSV emotion order
    pub fn reorder(&self, probs: &[f32]) -> Result<[f32; NUM_EMOTIONS]> {
        let columns = self.emotion_columns()?;
        let mut out = [0.0f32; NUM_EMOTIONS];
        for (dst, &col) in out.iter_mut().zip(columns.iter()) {
            *dst = match probs.get(col) {
                Some(p) => *p,
                None => bail!("Probability vector has {} entries, need column {col}", probs.len()),
            };
        }
        Ok(out)
    }
}
