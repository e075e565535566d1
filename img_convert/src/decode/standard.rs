//! JPEG, PNG, TIFF, WebP, GIF and BMP through the `image` crate.

use super::DecodedImage;
use crate::error::{ConvertError, Result};
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::path::Path;
use tracing::debug;

/// Decodes by content, falling back to the extension when the header is
/// not recognized. The EXIF orientation is read but not applied.
pub fn decode(path: &Path) -> Result<DecodedImage> {
    let reader = ImageReader::open(path)?
        .with_guessed_format()
        .map_err(ConvertError::Io)?;
    let mut decoder = reader.into_decoder().map_err(ConvertError::from_decode)?;

    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let image = DynamicImage::from_decoder(decoder).map_err(ConvertError::from_decode)?;

    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        ?orientation,
        "Decoded image"
    );
    Ok(DecodedImage::with_orientation(image, orientation))
}
