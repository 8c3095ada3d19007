//! Conversion of a normalized image into the flat input tensor.
//!
//! The layout is row-major with interleaved channels: rows outer, columns inner and, per pixel,
//! the red, green and blue values in that order. This is the NHWC layout of a `[1, H, W, 3]`
//! tensor with the batch dimension dropped.

use std::sync::Arc;

use image::RgbImage;

use cocoa_utils::{config::TensorEncoding, telemetry::timing_guard};

/// Number of channels written per pixel.
pub const CHANNELS: usize = 3;

/// Immutable encoded input, shared read-only by both models.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTensor {
    data: Arc<[f32]>,
    width: u32,
    height: u32,
}

impl EncodedTensor {
    /// Wrap an existing buffer; fails unless `data.len() == width * height * 3`.
    pub fn from_vec(data: Vec<f32>, width: u32, height: u32) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        anyhow::ensure!(
            data.len() == expected,
            "encoded tensor for {width}x{height} needs {expected} values, got {}",
            data.len()
        );
        Ok(Self {
            data: data.into(),
            width,
            height,
        })
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `[1, height, width, 3]`, the shape both models consume.
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, CHANNELS]
    }
}

/// Encode every pixel of `image` with the given value range.
pub fn encode(image: &RgbImage, encoding: &TensorEncoding) -> EncodedTensor {
    let _guard = timing_guard("cocoa_core::encode", log::Level::Trace);
    let (width, height) = image.dimensions();
    let data: Vec<f32> = image
        .as_raw()
        .chunks_exact(CHANNELS)
        .flat_map(|pixel| {
            [
                encoding.encode(0, pixel[0]),
                encoding.encode(1, pixel[1]),
                encoding.encode(2, pixel[2]),
            ]
        })
        .collect();

    EncodedTensor {
        data: data.into(),
        width,
        height,
    }
}
