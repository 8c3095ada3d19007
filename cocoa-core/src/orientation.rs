//! Capture orientation read from EXIF metadata.
//!
//! Phone cameras store pixels in sensor order and record how the photo should be turned in the
//! EXIF `Orientation` tag. Only the pure rotations are honoured: tag values 3, 6 and 8 map to
//! 180, 90 and 270 degrees clockwise. Mirrored variants, a missing tag and unreadable metadata
//! all mean "no rotation"; a bad tag never aborts classification.

use std::{fs, io::Cursor, path::Path};

use image::DynamicImage;
use log::debug;
use serde::{Deserialize, Serialize};

/// Clockwise rotation needed to bring a captured image upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Upright,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    /// Map a raw EXIF orientation value.
    pub fn from_exif(value: u32) -> Self {
        match value {
            3 => Orientation::Rotate180,
            6 => Orientation::Rotate90,
            8 => Orientation::Rotate270,
            _ => Orientation::Upright,
        }
    }

    /// Map a clockwise angle in degrees; `None` for anything but a multiple of 90.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Orientation::Upright),
            90 => Some(Orientation::Rotate90),
            180 => Some(Orientation::Rotate180),
            270 => Some(Orientation::Rotate270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Orientation::Upright => 0,
            Orientation::Rotate90 => 90,
            Orientation::Rotate180 => 180,
            Orientation::Rotate270 => 270,
        }
    }

    pub fn is_upright(self) -> bool {
        self == Orientation::Upright
    }

    /// Read the orientation from an encoded image (JPEG, PNG, TIFF, WebP, HEIF containers).
    pub fn read_from_bytes(bytes: &[u8]) -> Self {
        match read_exif_value(bytes) {
            Ok(Some(value)) => Self::from_exif(value),
            Ok(None) => Orientation::Upright,
            Err(err) => {
                debug!("no usable EXIF orientation ({err}); assuming upright");
                Orientation::Upright
            }
        }
    }

    /// Read the orientation from an image file on disk.
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => Self::read_from_bytes(&bytes),
            Err(err) => {
                debug!(
                    "could not read {} for EXIF orientation ({err}); assuming upright",
                    path.display()
                );
                Orientation::Upright
            }
        }
    }

    /// Rotate `image` clockwise so it is upright.
    pub fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Orientation::Upright => image.clone(),
            Orientation::Rotate90 => image.rotate90(),
            Orientation::Rotate180 => image.rotate180(),
            Orientation::Rotate270 => image.rotate270(),
        }
    }
}

fn read_exif_value(bytes: &[u8]) -> Result<Option<u32>, exif::Error> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new().read_from_container(&mut cursor)?;
    Ok(exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0)))
}
