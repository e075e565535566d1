//! Decoders: file on disk to pixels plus the orientation still to apply.

pub mod heif;
pub mod raw;
pub mod standard;

use image::metadata::Orientation;
use image::DynamicImage;

/// Output of a decoder. Pixels are stored as the file lays them out; the
/// normalizer applies `orientation` afterwards.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub image: DynamicImage,
    pub orientation: Orientation,
}

impl DecodedImage {
    pub fn upright(image: DynamicImage) -> Self {
        Self {
            image,
            orientation: Orientation::NoTransforms,
        }
    }

    pub fn with_orientation(image: DynamicImage, orientation: Orientation) -> Self {
        Self { image, orientation }
    }
}
