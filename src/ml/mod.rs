// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here:
//
//   model.rs     — ResNet-18/34/50/101/152 built from Burn nn layers
//   transfer.rs  — pretrained weight import, freezing, head swap
//   accuracy.rs  — top-k accuracy
//   trainer.rs   — epoch loop, lr schedule, validation, checkpoints
//   predictor.rs — softmax inference on single images
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// ResNet backbone architecture
pub mod model;

/// Pretrained weights and classifier replacement
pub mod transfer;

/// Top-k accuracy
pub mod accuracy;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine for the test split
pub mod predictor;

/// Backend used for training (gradients tracked)
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend used for validation, evaluation and prediction
pub type InferBackend = burn::backend::Wgpu;
