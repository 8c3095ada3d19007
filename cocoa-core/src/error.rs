//! Error taxonomy surfaced by the classification pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::labels::ModelKind;

/// Failures that terminate a classification request.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("failed to load {kind} model from {}: {source:#}", .path.display())]
    ModelLoad {
        kind: ModelKind,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to decode image: {source:#}")]
    ImageDecode {
        #[source]
        source: anyhow::Error,
    },
    #[error("source image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("invalid pipeline configuration: {0:#}")]
    Config(anyhow::Error),
}

/// Failure of a single forward pass; turned into the sentinel result for that model only.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{kind} model has been released")]
    Released { kind: ModelKind },
    #[error("{kind} model execution failed: {source:#}")]
    Execution {
        kind: ModelKind,
        #[source]
        source: anyhow::Error,
    },
    #[error("{kind} model returned {actual} scores, expected {expected}")]
    OutputLength {
        kind: ModelKind,
        expected: usize,
        actual: usize,
    },
}

impl InferenceError {
    pub fn kind(&self) -> ModelKind {
        match self {
            InferenceError::Released { kind }
            | InferenceError::Execution { kind, .. }
            | InferenceError::OutputLength { kind, .. } => *kind,
        }
    }
}
