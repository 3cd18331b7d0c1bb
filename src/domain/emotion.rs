// ============================================================
// Layer 3 — Emotion Classes
// ============================================================
// The classifier always predicts exactly seven emotions. The
// order of the variants below is the column order of every
// output CSV, independent of how the class folders sort on disk.
//
// Reference: Rust Book §6 (Enums)

use anyhow::{bail, Result};
use std::{fmt, str::FromStr};

/// Number of output classes of the fine-tuned head
pub const NUM_EMOTIONS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl Emotion {
    /// All emotions in CSV column order
    pub const ALL: [Emotion; NUM_EMOTIONS] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    /// The folder / column name for this emotion
    pub fn name(self) -> &'static str {
        match self {
            Emotion::Angry    => "Angry",
            Emotion::Disgust  => "Disgust",
            Emotion::Fear     => "Fear",
            Emotion::Happy    => "Happy",
            Emotion::Neutral  => "Neutral",
            Emotion::Sad      => "Sad",
            Emotion::Surprise => "Surprise",
        }
    }

    /// Header row shared by the per-image and per-subject CSVs:
    /// `id,Angry,Disgust,Fear,Happy,Neutral,Sad,Surprise`
    pub fn csv_header() -> [&'static str; NUM_EMOTIONS + 1] {
        let mut header = ["id"; NUM_EMOTIONS + 1];
        for (slot, emotion) in header[1..].iter_mut().zip(Self::ALL) {
            *slot = emotion.name();
        }
        header
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Emotion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Self::ALL.iter().find(|e| e.name() == s) {
            Some(e) => Ok(*e),
            None    => bail!("Unknown emotion '{s}'"),
        }
    }
}
