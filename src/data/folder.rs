// ============================================================
// Layer 4 — Image Folder Scanners
// ============================================================
// Two directory layouts are understood:
//
//   ImageFolder (train / val):
//     <root>/<Class>/**/<image>
//     Class index = position of <Class> among the sorted folder names.
//     Any file with a common image extension is included.
//
//   TestImageFolder (test):
//     <root>/<Group>/**/<name>.jpg
//     Only files whose name ends in "jpg" are included, and files
//     sitting directly in <root> are ignored.
//
// Both walk directories in sorted order so the resulting lists are
// deterministic; subject grouping in the test workflow depends on it.
//
// Images that do not decode (bad header or corrupt body) are
// dropped here with a warning instead of cutting a DataLoader
// pass short later on.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{
    class_map::ClassMap,
    image::{LabelledImage, UnlabelledImage},
    traits::ImageSource,
};

/// Extensions accepted by `ImageFolder` (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 9] =
    ["jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp"];

/// True if the file name ends with one of `IMAGE_EXTENSIONS`
pub fn has_image_extension(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_lowercase(),
        None    => return false,
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{ext}")))
}

/// Test images only need to end in "jpg"
pub fn is_test_image(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with("jpg"))
        .unwrap_or(false)
}

// ─── ImageFolder ──────────────────────────────────────────────────────────────
pub struct ImageFolder {
    root: PathBuf,
}

impl ImageFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Class names from the immediate sub-directories of the root
    pub fn class_map(&self) -> Result<ClassMap> {
        let names = sorted_subdirs(&self.root)?
            .iter()
            .filter_map(|d| d.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        Ok(ClassMap::new(names))
    }
}

impl ImageSource for ImageFolder {
    type Item = LabelledImage;

    fn load_all(&self) -> Result<Vec<LabelledImage>> {
        let class_map = self.class_map()?;
        if class_map.is_empty() {
            bail!("No class folders found in '{}'", self.root.display());
        }

        let mut images = Vec::new();
        for (label, class) in class_map.classes().iter().enumerate() {
            let mut files = Vec::new();
            collect_files(&self.root.join(class), &has_image_extension, &mut files)?;
            let before = images.len();
            images.extend(
                files
                    .into_iter()
                    .filter(|p| decodes(p))
                    .map(|path| LabelledImage { path, label }),
            );
            tracing::debug!("  Class {}: {} ({} images)", label, class, images.len() - before);
        }

        tracing::info!(
            "Found {} images in {} classes under '{}'",
            images.len(),
            class_map.len(),
            self.root.display()
        );
        Ok(images)
    }
}

// ─── TestImageFolder ──────────────────────────────────────────────────────────
pub struct TestImageFolder {
    root: PathBuf,
}

impl TestImageFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageSource for TestImageFolder {
    type Item = UnlabelledImage;

    fn load_all(&self) -> Result<Vec<UnlabelledImage>> {
        let mut files = Vec::new();
        for dir in sorted_subdirs(&self.root)? {
            collect_files(&dir, &is_test_image, &mut files)?;
        }

        let images: Vec<UnlabelledImage> = files
            .into_iter()
            .filter(|p| decodes(p))
            .map(|path| UnlabelledImage { path })
            .collect();

        tracing::info!("Found {} test images under '{}'", images.len(), self.root.display());
        Ok(images)
    }
}

// ─── Directory helpers ────────────────────────────────────────────────────────

/// Immediate sub-directories of `root`, sorted by name
fn sorted_subdirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("Cannot read dataset directory '{}'", root.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Depth-first walk: files of `dir` (sorted) first, then each
/// sub-directory (sorted) recursively.
fn collect_files(dir: &Path, keep: &dyn Fn(&Path) -> bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    let (subdirs, files): (Vec<PathBuf>, Vec<PathBuf>) =
        entries.into_iter().partition(|p| p.is_dir());

    out.extend(files.into_iter().filter(|p| keep(p.as_path())));
    for sub in subdirs {
        collect_files(&sub, keep, out)?;
    }
    Ok(())
}

fn decodes(path: &Path) -> bool {
    match image::open(path) {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Skipping '{}': {}", path.display(), e);
            false
        }
    }
}
