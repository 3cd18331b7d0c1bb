// ============================================================
// Layer 3 — Image References
// ============================================================
// Paths to images found on disk. Pixels are only read when the
// data pipeline (Layer 4) asks for them.

use std::path::PathBuf;

/// An image inside a class folder: `<split>/<Class>/.../file.jpg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledImage {
    pub path:  PathBuf,
    /// Index into the sorted class folder names
    pub label: usize,
}

/// A test image with no label; its path doubles as its id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlabelledImage {
    pub path: PathBuf,
}

impl UnlabelledImage {
    /// The id written to the per-image CSV
    pub fn id(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
