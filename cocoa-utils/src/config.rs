//! Shared configuration types consumed across the cocoa workspace.
//!
//! These structures describe where the two classification models live, how captured photos are
//! resized and encoded before inference, and which diagnostics are enabled. They serialize to a
//! JSON settings file so the same configuration can be reused by every front end.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Skin-condition classes in training order.
pub const DEFAULT_SKIN_LABELS: [&str; 2] = ["dikupas", "tidak_dikupas"];
/// Bean-color classes in training order.
pub const DEFAULT_COLOR_LABELS: [&str; 3] = ["cokelat", "cokelat_muda", "hitam"];

const DEFAULT_SKIN_MODEL: &str = "models/mobilenetv2_model_a_20250621_0107.tflite";
const DEFAULT_COLOR_MODEL: &str = "models/mobilenetv2_model_d_warna_20250621_0202.tflite";

/// Location and class labels of one bundled classification model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSettings {
    /// Path to the `.tflite` or `.onnx` model file.
    pub path: PathBuf,
    /// Class labels, index-aligned with the model output.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl ModelSettings {
    fn new(path: &str, labels: &[&str]) -> Self {
        Self {
            path: PathBuf::from(path),
            labels: labels.iter().map(|label| label.to_string()).collect(),
        }
    }

    /// Default settings for the skin-condition (peeled / not peeled) model.
    pub fn skin_condition() -> Self {
        Self::new(DEFAULT_SKIN_MODEL, &DEFAULT_SKIN_LABELS)
    }

    /// Default settings for the bean-color model.
    pub fn bean_color() -> Self {
        Self::new(DEFAULT_COLOR_MODEL, &DEFAULT_COLOR_LABELS)
    }
}

/// Resampling filter used when scaling photos down to the model resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    /// Bilinear interpolation (Triangle filter).
    #[default]
    Bilinear,
    /// Bicubic interpolation (Catmull-Rom).
    Bicubic,
    /// Lanczos with a window of 3.
    Lanczos,
}

impl ResizeFilter {
    pub fn as_label(self) -> &'static str {
        match self {
            ResizeFilter::Bilinear => "Bilinear",
            ResizeFilter::Bicubic => "Bicubic",
            ResizeFilter::Lanczos => "Lanczos",
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label().to_ascii_lowercase())
    }
}

impl FromStr for ResizeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bilinear" | "triangle" => Ok(ResizeFilter::Bilinear),
            "bicubic" | "catmull_rom" | "catmullrom" => Ok(ResizeFilter::Bicubic),
            "lanczos" | "lanczos3" => Ok(ResizeFilter::Lanczos),
            other => Err(format!(
                "invalid resize filter '{other}'; expected 'bilinear', 'bicubic' or 'lanczos'"
            )),
        }
    }
}

/// Model input resolution in pixels (width x height) plus the resampling filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputDimensions {
    pub width: u32,
    pub height: u32,
    pub resize_filter: ResizeFilter,
}

impl Default for InputDimensions {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            resize_filter: ResizeFilter::Bilinear,
        }
    }
}

/// Value range written into the input tensor for each 8-bit channel.
///
/// Which range is correct depends on how the bundled models were trained; the
/// default matches the models shipped with the app (raw 0-255 values).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum TensorEncoding {
    /// Channel values unscaled, in `[0, 255]`.
    #[default]
    Raw,
    /// Channel values divided by 255, in `[0, 1]`.
    Unit,
    /// `(value - mean) / std` per R, G, B channel.
    Standardized { mean: [f32; 3], std: [f32; 3] },
}

impl TensorEncoding {
    /// Encode a single 8-bit channel value of the given channel index (0 = R, 1 = G, 2 = B).
    #[inline]
    pub fn encode(&self, channel: usize, value: u8) -> f32 {
        let value = value as f32;
        match self {
            TensorEncoding::Raw => value,
            TensorEncoding::Unit => value / 255.0,
            TensorEncoding::Standardized { mean, std } => (value - mean[channel]) / std[channel],
        }
    }

    /// Check that the encoding can be applied (no zero or non-finite divisors).
    pub fn validate(&self) -> Result<()> {
        if let TensorEncoding::Standardized { mean, std } = self {
            anyhow::ensure!(
                mean.iter().all(|m| m.is_finite()),
                "standardized encoding mean must be finite (got {mean:?})"
            );
            anyhow::ensure!(
                std.iter().all(|s| s.is_finite() && *s != 0.0),
                "standardized encoding std must be finite and non-zero (got {std:?})"
            );
        }
        Ok(())
    }
}

/// Inference scheduling options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct InferenceSettings {
    /// Run the two models on separate worker threads.
    pub parallel: bool,
}

/// Options for turning raw model scores into probabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterpretationSettings {
    /// Scores summing to within this distance of 1.0 (and with no negatives) are used as-is.
    pub sum_tolerance: f32,
}

impl Default for InterpretationSettings {
    fn default() -> Self {
        Self { sum_tolerance: 0.1 }
    }
}

impl InterpretationSettings {
    /// The tolerance must be a finite, non-negative distance.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.sum_tolerance.is_finite() && self.sum_tolerance >= 0.0,
            "interpretation sum_tolerance must be finite and non-negative (got {})",
            self.sum_tolerance
        );
        Ok(())
    }
}

/// Pixel statistics and per-model score logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub enabled: bool,
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Whether telemetry timing logs are enabled.
    pub enabled: bool,
    /// Logging level for telemetry output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }

    /// Update the level string from a `LevelFilter` value.
    pub fn set_level(&mut self, level: LevelFilter) {
        self.level = level.as_str().to_ascii_lowercase();
    }
}

/// Persistent application settings.
///
/// Aggregates every user-configurable parameter of the classification pipeline so it can be
/// loaded from and saved to a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Peeled / not-peeled model.
    pub skin_model: ModelSettings,
    /// Bean color model.
    pub color_model: ModelSettings,
    /// Model input resolution and resize filter.
    pub input: InputDimensions,
    /// Input tensor value range.
    pub encoding: TensorEncoding,
    pub inference: InferenceSettings,
    pub interpretation: InterpretationSettings,
    pub diagnostics: DiagnosticsSettings,
    /// Telemetry and diagnostics preferences.
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            skin_model: ModelSettings::skin_condition(),
            color_model: ModelSettings::bean_color(),
            input: InputDimensions::default(),
            encoding: TensorEncoding::default(),
            inference: InferenceSettings::default(),
            interpretation: InterpretationSettings::default(),
            diagnostics: DiagnosticsSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file.
    ///
    /// Sections missing from the file take their defaults. An empty label list is replaced by
    /// the default labels of that model.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;

        if settings.skin_model.labels.is_empty() {
            settings.skin_model.labels = ModelSettings::skin_condition().labels;
        }
        if settings.color_model.labels.is_empty() {
            settings.color_model.labels = ModelSettings::bean_color().labels;
        }
        settings
            .encoding
            .validate()
            .with_context(|| format!("invalid encoding in {}", path.display()))?;
        settings
            .interpretation
            .validate()
            .with_context(|| format!("invalid interpretation settings in {}", path.display()))?;

        Ok(settings)
    }

    /// Serialize settings to disk in pretty-printed JSON.
    ///
    /// This will overwrite the file if it already exists.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// Returns the default path for persisted settings (`config/cocoa_settings.json`).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/cocoa_settings.json"))
        .unwrap_or_else(|_| PathBuf::from("config/cocoa_settings.json"))
}
