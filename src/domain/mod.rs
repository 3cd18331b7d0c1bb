// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works with:
//
//   emotion.rs    — the seven emotion classes and CSV column order
//   arch.rs       — supported backbone architectures
//   image.rs      — labelled / unlabelled image references on disk
//   class_map.rs  — folder-name → class-index mapping
//   prediction.rs — per-image probabilities and per-subject grouping
//   traits.rs     — seams other layers implement
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The seven emotion classes
pub mod emotion;

// Backbone architecture names
pub mod arch;

// Image references produced by the dataset scanners
pub mod image;

// Class name ↔ index mapping built from the dataset folders
pub mod class_map;

// Probability rows and subject aggregation
pub mod prediction;

// Core abstractions (traits) that other layers implement
pub mod traits;
