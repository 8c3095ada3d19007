//! Turning raw model scores into a label and confidence.
//!
//! Models exported with a softmax head already emit a probability distribution; models exported
//! without one emit logits. A score vector is used as-is when it sums to within
//! `sum_tolerance` of 1.0 and has no negative entry, otherwise a numerically stable softmax is
//! applied first. The highest entry wins, the earliest index on ties.

use log::warn;
use serde::{Deserialize, Serialize};

use cocoa_utils::config::InterpretationSettings;

use crate::labels::LabelSet;

/// Label reported when a model could not produce a usable result.
pub const ERROR_LABEL: &str = "error";

/// Top class of one model together with the distribution it was picked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// Probability of `label`, in `[0, 1]`.
    pub confidence: f32,
    /// Post-processed distribution, index-aligned with the model's labels. Empty for the
    /// sentinel.
    pub probabilities: Vec<f32>,
    /// Whether softmax had to be applied to the raw scores.
    pub softmax_applied: bool,
}

impl Classification {
    /// The `("error", 0.0)` sentinel.
    pub fn error() -> Self {
        Self {
            label: ERROR_LABEL.to_string(),
            confidence: 0.0,
            probabilities: Vec::new(),
            softmax_applied: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.label == ERROR_LABEL && self.probabilities.is_empty()
    }
}

/// Interpretation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpretConfig {
    pub sum_tolerance: f32,
}

impl Default for InterpretConfig {
    fn default() -> Self {
        Self { sum_tolerance: 0.1 }
    }
}

impl From<&InterpretationSettings> for InterpretConfig {
    fn from(settings: &InterpretationSettings) -> Self {
        Self {
            sum_tolerance: settings.sum_tolerance,
        }
    }
}

impl InterpretConfig {
    /// `true` when `scores` can be used without softmax.
    pub fn is_distribution(&self, scores: &[f32]) -> bool {
        let sum: f32 = scores.iter().sum();
        let (lo, hi) = (1.0 - self.sum_tolerance, 1.0 + self.sum_tolerance);
        sum >= lo && sum <= hi && scores.iter().all(|&s| s >= 0.0)
    }
}

/// Numerically stable softmax: subtract the maximum, exponentiate, normalize.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins ties. `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Interpret a raw score vector against its labels.
///
/// Empty vectors, non-finite scores and a length that differs from the label count produce the
/// sentinel.
pub fn interpret(scores: &[f32], labels: &LabelSet, config: &InterpretConfig) -> Classification {
    if scores.is_empty() {
        warn!("empty score vector; reporting error");
        return Classification::error();
    }
    if scores.len() != labels.len() {
        warn!(
            "score vector has {} entries but {} labels are configured; reporting error",
            scores.len(),
            labels.len()
        );
        return Classification::error();
    }
    if scores.iter().any(|s| !s.is_finite()) {
        warn!("score vector contains non-finite values {scores:?}; reporting error");
        return Classification::error();
    }

    let softmax_applied = !config.is_distribution(scores);
    let probabilities = if softmax_applied {
        softmax(scores)
    } else {
        scores.to_vec()
    };

    let Some(index) = argmax(&probabilities) else {
        return Classification::error();
    };
    let Some(label) = labels.get(index) else {
        return Classification::error();
    };

    Classification {
        label: label.to_string(),
        confidence: probabilities[index],
        probabilities,
        softmax_applied,
    }
}
