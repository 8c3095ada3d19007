//! Pixel statistics used to spot unusable captures.
//!
//! An overexposed or washed-out photo still produces a confident-looking
//! classification, so the pipeline can sample a sparse 10x10 grid of pixels and
//! summarise it. Two heuristics are derived from the sample:
//! the average brightness across all three channels above 240 marks the frame
//! as `very_bright`, and a maximum per-channel spread below 20 marks it as
//! `low_variation`. A frame that trips both is `likely_blank`. The thresholds are
//! expressed in raw 8-bit units and are independent of the tensor encoding.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Number of sample columns and rows.
const GRID: u32 = 10;
const BRIGHTNESS_THRESHOLD: f64 = 240.0;
const VARIATION_THRESHOLD: u8 = 20;

/// Min / max / mean of one color channel over the sampled pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub min: u8,
    pub max: u8,
    pub mean: f64,
}

impl ChannelStats {
    fn from_samples(values: &[u8]) -> Self {
        if values.is_empty() {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
            };
        }
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        let mean = values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64;
        Self { min, max, mean }
    }

    /// Spread between the brightest and darkest sample.
    pub fn range(&self) -> u8 {
        self.max.saturating_sub(self.min)
    }
}

/// Summary of a sparse pixel sample of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    pub red: ChannelStats,
    pub green: ChannelStats,
    pub blue: ChannelStats,
    /// Mean of the three channel means, `0..=255`.
    pub brightness: f64,
    /// Largest per-channel range, `0..=255`.
    pub variation: u8,
}

impl ImageStats {
    /// Sample a 10x10 grid spread over the image.
    ///
    /// Sample `i` sits at `x = (i % 10) * max(width / 10, 1)` and
    /// `y = (i / 10) * max(height / 10, 1)`, clamped to the last column/row, so
    /// images narrower than ten pixels resample their edge pixels.
    pub fn sample(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let capacity = (GRID * GRID) as usize;
        let mut red = Vec::with_capacity(capacity);
        let mut green = Vec::with_capacity(capacity);
        let mut blue = Vec::with_capacity(capacity);

        if width > 0 && height > 0 {
            let step_x = (width / GRID).max(1);
            let step_y = (height / GRID).max(1);
            for i in 0..GRID * GRID {
                let x = ((i % GRID) * step_x).min(width - 1);
                let y = ((i / GRID) * step_y).min(height - 1);
                let pixel = image.get_pixel(x, y);
                red.push(pixel[0]);
                green.push(pixel[1]);
                blue.push(pixel[2]);
            }
        }

        let red = ChannelStats::from_samples(&red);
        let green = ChannelStats::from_samples(&green);
        let blue = ChannelStats::from_samples(&blue);
        let brightness = (red.mean + green.mean + blue.mean) / 3.0;
        let variation = red.range().max(green.range()).max(blue.range());

        Self {
            width,
            height,
            red,
            green,
            blue,
            brightness,
            variation,
        }
    }

    pub fn very_bright(&self) -> bool {
        self.brightness > BRIGHTNESS_THRESHOLD
    }

    pub fn low_variation(&self) -> bool {
        self.variation < VARIATION_THRESHOLD
    }

    /// Mostly white with almost no detail; classification results are unreliable.
    pub fn likely_blank(&self) -> bool {
        self.very_bright() && self.low_variation()
    }
}
