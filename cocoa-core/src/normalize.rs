//! Orientation correction and resizing to the model input resolution.

use std::borrow::Cow;

use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};

use cocoa_utils::{
    config::{InputDimensions, ResizeFilter},
    resize_image,
    telemetry::timing_guard,
};

use crate::{error::ClassifyError, orientation::Orientation};

/// Target resolution and filter for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeConfig {
    pub width: u32,
    pub height: u32,
    pub filter: ResizeFilter,
}

impl NormalizeConfig {
    pub const fn new(width: u32, height: u32, filter: ResizeFilter) -> Self {
        Self {
            width,
            height,
            filter,
        }
    }

    fn filter_type(&self) -> FilterType {
        self.filter.into()
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        InputDimensions::default().into()
    }
}

impl From<InputDimensions> for NormalizeConfig {
    fn from(dimensions: InputDimensions) -> Self {
        let InputDimensions {
            width,
            height,
            resize_filter,
        } = dimensions;
        NormalizeConfig::new(width, height, resize_filter)
    }
}

impl From<&InputDimensions> for NormalizeConfig {
    fn from(dimensions: &InputDimensions) -> Self {
        (*dimensions).into()
    }
}

/// Rotate `image` upright, then resize it to exactly `config.width` x `config.height`.
///
/// Aspect ratio is not preserved. No resampling happens when the (rotated) source already has
/// the target size.
pub fn normalize(
    image: &DynamicImage,
    orientation: Orientation,
    config: &NormalizeConfig,
) -> Result<RgbImage, ClassifyError> {
    let _guard = timing_guard("cocoa_core::normalize", log::Level::Trace);
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ClassifyError::EmptyImage { width, height });
    }
    if config.width == 0 || config.height == 0 {
        return Err(ClassifyError::Config(anyhow::anyhow!(
            "input dimensions must be greater than zero (got {}x{})",
            config.width,
            config.height
        )));
    }

    let oriented: Cow<'_, DynamicImage> = if orientation.is_upright() {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(orientation.apply(image))
    };

    Ok(resize_to(&oriented, config))
}

fn resize_to(image: &DynamicImage, config: &NormalizeConfig) -> RgbImage {
    if image.dimensions() == (config.width, config.height) {
        return match image.as_rgb8() {
            Some(rgb) => rgb.clone(),
            None => image.to_rgb8(),
        };
    }
    resize_image(image, config.width, config.height, config.filter_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbaImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn default_config_is_256_bilinear() {
        let config = NormalizeConfig::default();
        assert_eq!((config.width, config.height), (256, 256));
        assert_eq!(config.filter, ResizeFilter::Bilinear);
    }

    #[test]
    fn output_has_target_dimensions_regardless_of_aspect() {
        let config = NormalizeConfig::default();
        for (w, h) in [(512, 512), (640, 480), (17, 300), (1, 1)] {
            let out = normalize(&gradient(w, h), Orientation::Upright, &config).unwrap();
            assert_eq!(out.dimensions(), (256, 256), "source {w}x{h}");
        }
    }

    #[test]
    fn rotate_180_equals_rotate_then_resize() {
        let config = NormalizeConfig::default();
        let source = gradient(300, 200);

        let normalized = normalize(&source, Orientation::Rotate180, &config).unwrap();
        let expected = resize_image(&source.rotate180(), 256, 256, FilterType::Triangle);
        assert_eq!(normalized, expected);
    }

    #[test]
    fn upright_applies_no_rotation() {
        let config = NormalizeConfig::default();
        let source = gradient(300, 200);

        let normalized = normalize(&source, Orientation::Upright, &config).unwrap();
        let expected = resize_image(&source, 256, 256, FilterType::Triangle);
        assert_eq!(normalized, expected);
    }

    #[test]
    fn quarter_turn_swaps_axes_before_resizing() {
        let config = NormalizeConfig::new(4, 8, ResizeFilter::Bilinear);
        let source = gradient(8, 4);

        let normalized = normalize(&source, Orientation::Rotate90, &config).unwrap();
        // After rotation the source is already 4x8, so pixels are copied verbatim.
        assert_eq!(normalized, source.rotate90().to_rgb8());
    }

    #[test]
    fn matching_size_is_passed_through_and_alpha_dropped() {
        let config = NormalizeConfig::new(2, 2, ResizeFilter::Lanczos);
        let rgba = RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 0]));
        let out = normalize(&DynamicImage::ImageRgba8(rgba), Orientation::Upright, &config).unwrap();
        assert_eq!(out.get_pixel(1, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn empty_source_is_rejected() {
        let config = NormalizeConfig::default();
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        let err = normalize(&empty, Orientation::Upright, &config).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyImage { width: 0, height: 5 }));
    }
}
