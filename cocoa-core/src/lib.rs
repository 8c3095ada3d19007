//! Core cocoa bean classification pipeline.
//!
//! A photo is rotated upright, resized to the model resolution and encoded as a flat `f32`
//! tensor. Two `tract` models (skin condition and bean color) score it, the scores are turned
//! into a label and confidence, and the pair is mapped to display strings and a roast status.

/// Conversion of normalized pixels into the model input tensor.
pub mod encode;
/// Ownership and scheduling of the two models.
pub mod engine;
/// Error types for loading, decoding and inference.
pub mod error;
/// Score interpretation (softmax correction, argmax).
pub mod interpret;
/// Class labels and their known meanings.
pub mod labels;
/// Model loading and execution.
pub mod model;
/// Orientation correction and resizing.
pub mod normalize;
/// Diagnostics hooks.
pub mod observer;
/// EXIF orientation handling.
pub mod orientation;
/// High-level classification runner.
pub mod pipeline;
/// Display strings and roast status.
pub mod presentation;

pub use encode::{EncodedTensor, encode};
pub use engine::{InferenceEngine, ModelOutputs, SharedModel};
pub use error::{ClassifyError, InferenceError};
pub use interpret::{Classification, InterpretConfig, argmax, interpret, softmax};
pub use labels::{BeanColor, LabelSet, ModelKind, RoastStatus, SkinCondition};
pub use model::{ClassificationModel, ModelFormat, ModelShape, TractClassifier};
pub use normalize::{NormalizeConfig, normalize};
pub use observer::{LogObserver, PipelineObserver, Stage};
pub use orientation::Orientation;
pub use pipeline::{PipelineConfig, RoastClassifier, RoastReport, SourceImage};
pub use presentation::RoastPresentation;

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
