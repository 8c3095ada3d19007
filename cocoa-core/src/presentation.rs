//! Display strings for a pair of classification results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    interpret::Classification,
    labels::{BeanColor, RoastStatus, SkinCondition},
};

/// Human readable skin condition; unknown labels pass through unchanged.
pub fn skin_display_name(label: &str) -> &str {
    SkinCondition::from_label(label)
        .map(SkinCondition::display_name)
        .unwrap_or(label)
}

/// Human readable bean color; unknown labels pass through unchanged.
pub fn color_display_name(label: &str) -> &str {
    BeanColor::from_label(label)
        .map(BeanColor::display_name)
        .unwrap_or(label)
}

/// Roast status text for a color label, `"unknown"` when unrecognised.
pub fn roast_status(label: &str) -> &'static str {
    RoastStatus::from_color_label(label).as_str()
}

/// Confidence in `[0, 1]` as a whole percentage, truncated and clamped to `0..=100`.
pub fn confidence_percent(confidence: f32) -> u8 {
    if !confidence.is_finite() {
        return 0;
    }
    (confidence * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// What the user sees for one scanned bean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoastPresentation {
    pub skin_condition: String,
    pub skin_confidence_pct: u8,
    pub bean_color: String,
    pub color_confidence_pct: u8,
    pub roast_status: String,
}

impl RoastPresentation {
    pub fn from_results(skin: &Classification, color: &Classification) -> Self {
        Self {
            skin_condition: skin_display_name(&skin.label).to_string(),
            skin_confidence_pct: confidence_percent(skin.confidence),
            bean_color: color_display_name(&color.label).to_string(),
            color_confidence_pct: confidence_percent(color.confidence),
            roast_status: roast_status(&color.label).to_string(),
        }
    }

    /// e.g. `peeled (90%)`.
    pub fn skin_condition_text(&self) -> String {
        format!("{} ({}%)", self.skin_condition, self.skin_confidence_pct)
    }

    /// e.g. `black (80%)`.
    pub fn bean_color_text(&self) -> String {
        format!("{} ({}%)", self.bean_color, self.color_confidence_pct)
    }
}

impl fmt::Display for RoastPresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Skin condition: {}", self.skin_condition_text())?;
        writeln!(f, "Bean color: {}", self.bean_color_text())?;
        write!(f, "Roast status: {}", self.roast_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, confidence: f32) -> Classification {
        Classification {
            label: label.to_string(),
            confidence,
            probabilities: vec![confidence],
            softmax_applied: false,
        }
    }

    #[test]
    fn known_labels_map_to_display_names() {
        assert_eq!(skin_display_name("dikupas"), "peeled");
        assert_eq!(skin_display_name("tidak_dikupas"), "not peeled");
        assert_eq!(color_display_name("cokelat"), "brown");
        assert_eq!(color_display_name("cokelat_muda"), "light brown");
        assert_eq!(color_display_name("hitam"), "black");
        assert_eq!(roast_status("cokelat"), "mature");
        assert_eq!(roast_status("cokelat_muda"), "not mature");
        assert_eq!(roast_status("hitam"), "over-roasted");
    }

    #[test]
    fn unknown_labels_pass_through() {
        assert_eq!(skin_display_name("error"), "error");
        assert_eq!(color_display_name("ungu"), "ungu");
        assert_eq!(roast_status("ungu"), "unknown");
    }

    #[test]
    fn percentages_truncate_and_clamp() {
        assert_eq!(confidence_percent(0.9), 90);
        assert_eq!(confidence_percent(0.8214), 82);
        assert_eq!(confidence_percent(0.995), 99);
        assert_eq!(confidence_percent(0.979), 97);
        assert_eq!(confidence_percent(1.0), 100);
        assert_eq!(confidence_percent(0.0), 0);
        assert_eq!(confidence_percent(1.2), 100);
        assert_eq!(confidence_percent(-0.3), 0);
        assert_eq!(confidence_percent(f32::NAN), 0);
    }

    #[test]
    fn presentation_formats_three_lines() {
        let view = RoastPresentation::from_results(&result("dikupas", 0.9), &result("hitam", 0.8));
        assert_eq!(view.skin_condition_text(), "peeled (90%)");
        assert_eq!(view.bean_color, "black");
        assert_eq!(view.roast_status, "over-roasted");
        assert_eq!(
            view.to_string(),
            "Skin condition: peeled (90%)\nBean color: black (80%)\nRoast status: over-roasted"
        );
    }

    #[test]
    fn sentinel_results_present_as_error() {
        let view =
            RoastPresentation::from_results(&Classification::error(), &Classification::error());
        assert_eq!(view.skin_condition_text(), "error (0%)");
        assert_eq!(view.roast_status, "unknown");
    }
}
