//! Optional diagnostics hooks called while a request runs.
//!
//! Nothing is computed for diagnostics unless an observer is attached to the pipeline.

use std::fmt;

use log::{debug, info, warn};

use cocoa_utils::diagnostics::ImageStats;

use crate::{error::InferenceError, interpret::Classification, labels::ModelKind};

/// Log target used by [`LogObserver`].
pub const DIAGNOSTICS_TARGET: &str = "cocoa::diagnostics";

/// Point in the pipeline at which image statistics were taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decoded image as received.
    Original,
    /// After orientation correction.
    Oriented,
    /// Resized to the model input resolution.
    Normalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Original => "original",
            Stage::Oriented => "oriented",
            Stage::Normalized => "normalized",
        })
    }
}

/// Receives intermediate values of a classification request. Every method defaults to a no-op.
pub trait PipelineObserver: Send + Sync {
    fn on_image(&self, _stage: Stage, _stats: &ImageStats) {}

    fn on_model_output(&self, _kind: ModelKind, _scores: &[f32], _result: &Classification) {}

    fn on_inference_error(&self, _kind: ModelKind, _error: &InferenceError) {}
}

/// Writes diagnostics to the `cocoa::diagnostics` log target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PipelineObserver for LogObserver {
    fn on_image(&self, stage: Stage, stats: &ImageStats) {
        debug!(
            target: DIAGNOSTICS_TARGET,
            "{stage} {}x{}: R {}..{} (avg {:.1}), G {}..{} (avg {:.1}), B {}..{} (avg {:.1}), brightness {:.1}, variation {}",
            stats.width,
            stats.height,
            stats.red.min,
            stats.red.max,
            stats.red.mean,
            stats.green.min,
            stats.green.max,
            stats.green.mean,
            stats.blue.min,
            stats.blue.max,
            stats.blue.mean,
            stats.brightness,
            stats.variation
        );
        if stage == Stage::Normalized && stats.likely_blank() {
            warn!(
                target: DIAGNOSTICS_TARGET,
                "normalized image is almost uniformly white (brightness {:.1}, variation {}); results may be unreliable",
                stats.brightness,
                stats.variation
            );
        }
    }

    fn on_model_output(&self, kind: ModelKind, scores: &[f32], result: &Classification) {
        let sum: f32 = scores.iter().sum();
        info!(
            target: DIAGNOSTICS_TARGET,
            "{kind}: raw {scores:?} (sum {sum:.4}) -> {} {:.4}{}",
            result.label,
            result.confidence,
            if result.softmax_applied { " after softmax" } else { "" }
        );
    }

    fn on_inference_error(&self, kind: ModelKind, error: &InferenceError) {
        warn!(target: DIAGNOSTICS_TARGET, "{kind} inference failed: {error}");
    }
}
