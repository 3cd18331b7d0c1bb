// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from class folders on disk to tensor batches:
//
//   class folders
//       │
//       ▼
//   ImageFolder / TestImageFolder  → sorted image paths (+ labels)
//       │
//       ▼
//   EmotionDataset                 → Burn Dataset, decodes lazily
//       │   (Transform: resize, crop, flip, normalise)
//       ▼
//   ImageBatcher                   → [N, 3, 224, 224] tensors
//       │
//       ▼
//   DataLoader                     → feeds the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Scans class-labelled and test directories
pub mod folder;

/// Resize / crop / flip / normalise
pub mod transform;

/// Implements Burn's Dataset trait over image paths
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
