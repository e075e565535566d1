//! Orientation correction and conversion to 3-channel RGB8.

use crate::decode::DecodedImage;
use image::RgbImage;

/// Decoded, upright, RGB8 pixels ready for resizing and encoding.
///
/// A raster belongs to exactly one conversion and is consumed by it.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster(RgbImage);

impl Raster {
    pub fn new(image: RgbImage) -> Self {
        Self(image)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.0
    }
}

/// Physically applies the orientation, then drops alpha, narrows 16-bit
/// and expands grey.
pub fn normalize(decoded: DecodedImage) -> Raster {
    let DecodedImage {
        mut image,
        orientation,
    } = decoded;
    image.apply_orientation(orientation);
    Raster(image.into_rgb8())
}
