//! Class label sets and the known label vocabulary of both models.

use std::fmt;

use anyhow::Result;
use cocoa_utils::config::{DEFAULT_COLOR_LABELS, DEFAULT_SKIN_LABELS, ModelSettings};
use serde::{Deserialize, Serialize};

/// Which of the two bundled models a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    SkinCondition,
    BeanColor,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::SkinCondition, ModelKind::BeanColor];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::SkinCondition => "skin condition",
            ModelKind::BeanColor => "bean color",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered class labels, index-aligned with a model's output vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Build a label set, rejecting empty lists and duplicate labels.
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        anyhow::ensure!(!labels.is_empty(), "label set must not be empty");
        for (index, label) in labels.iter().enumerate() {
            anyhow::ensure!(
                !labels[..index].contains(label),
                "duplicate class label '{label}'"
            );
        }
        Ok(Self { labels })
    }

    /// `["dikupas", "tidak_dikupas"]`.
    pub fn skin_condition() -> Self {
        Self::from_static(&DEFAULT_SKIN_LABELS)
    }

    /// `["cokelat", "cokelat_muda", "hitam"]`.
    pub fn bean_color() -> Self {
        Self::from_static(&DEFAULT_COLOR_LABELS)
    }

    /// Default labels for `kind`.
    pub fn for_kind(kind: ModelKind) -> Self {
        match kind {
            ModelKind::SkinCondition => Self::skin_condition(),
            ModelKind::BeanColor => Self::bean_color(),
        }
    }

    /// Labels from a model's settings, falling back to the defaults of `kind` when none are set.
    pub fn from_settings(kind: ModelKind, settings: &ModelSettings) -> Result<Self> {
        if settings.labels.is_empty() {
            Ok(Self::for_kind(kind))
        } else {
            Self::new(settings.labels.iter().cloned())
        }
    }

    fn from_static(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|label| label.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

/// Known outputs of the skin-condition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkinCondition {
    Peeled,
    NotPeeled,
}

impl SkinCondition {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "dikupas" => Some(SkinCondition::Peeled),
            "tidak_dikupas" => Some(SkinCondition::NotPeeled),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SkinCondition::Peeled => "peeled",
            SkinCondition::NotPeeled => "not peeled",
        }
    }
}

/// Known outputs of the bean-color model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeanColor {
    Brown,
    LightBrown,
    Black,
}

impl BeanColor {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "cokelat" => Some(BeanColor::Brown),
            "cokelat_muda" => Some(BeanColor::LightBrown),
            "hitam" => Some(BeanColor::Black),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BeanColor::Brown => "brown",
            BeanColor::LightBrown => "light brown",
            BeanColor::Black => "black",
        }
    }

    pub fn roast_status(self) -> RoastStatus {
        match self {
            BeanColor::Brown => RoastStatus::Mature,
            BeanColor::LightBrown => RoastStatus::NotMature,
            BeanColor::Black => RoastStatus::OverRoasted,
        }
    }
}

/// Roast maturity derived from the bean color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoastStatus {
    Mature,
    NotMature,
    OverRoasted,
    Unknown,
}

impl RoastStatus {
    /// Status for a raw color label; unrecognised labels (including the error sentinel) are
    /// `Unknown`.
    pub fn from_color_label(label: &str) -> Self {
        BeanColor::from_label(label)
            .map(BeanColor::roast_status)
            .unwrap_or(RoastStatus::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoastStatus::Mature => "mature",
            RoastStatus::NotMature => "not mature",
            RoastStatus::OverRoasted => "over-roasted",
            RoastStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RoastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
