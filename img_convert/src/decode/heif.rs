//! HEIC/HEIF containers.
//!
//! Support is conditional: libheif has to be compiled in (the default `heic`
//! feature) and has to accept this exact file. Anything else fails with
//! `UnsupportedFormat` before a decode is attempted.

use super::DecodedImage;
use crate::error::{ConvertError, Result};
use std::path::Path;

/// ISOBMFF brands that identify HEIF image containers.
const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
];

/// Reads the `ftyp` box major brand, if the bytes look like a HEIF file.
pub fn sniff_heif_brand(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return None;
    }
    let brand = &bytes[8..12];
    HEIF_BRANDS
        .iter()
        .any(|b| b.as_slice() == brand)
        .then(|| String::from_utf8_lossy(brand).into_owned())
}

#[cfg(feature = "heic")]
pub fn decode(path: &Path) -> Result<DecodedImage> {
    use image::{DynamicImage, RgbImage};
    use libheif_rs::{
        check_file_type, ColorSpace, FileTypeResult, HeifContext, LibHeif, RgbChroma,
    };
    use tracing::debug;

    let bytes = std::fs::read(path)?;
    match check_file_type(&bytes) {
        FileTypeResult::Supported => {}
        other => {
            return Err(ConvertError::UnsupportedFormat(format!(
                "libheif cannot read this file ({:?})",
                other
            )))
        }
    }

    let ctx = HeifContext::read_from_bytes(&bytes)
        .map_err(|e| ConvertError::Decode(format!("failed to read HEIF container: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| ConvertError::Decode(format!("failed to get primary image: {}", e)))?;

    // libheif applies the container's rotation and mirroring while decoding.
    let decoded = LibHeif::new()
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| ConvertError::Decode(format!("failed to decode HEIF: {}", e)))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| ConvertError::Decode("no interleaved RGB plane".to_string()))?;

    let width = plane.width as usize;
    let height = plane.height as usize;
    let row_bytes = width * 3;
    let mut pixels = Vec::with_capacity(row_bytes * height);
    for row in plane.data.chunks(plane.stride).take(height) {
        let row = row
            .get(..row_bytes)
            .ok_or_else(|| ConvertError::Decode("HEIF plane row is truncated".to_string()))?;
        pixels.extend_from_slice(row);
    }

    let image = RgbImage::from_raw(plane.width, plane.height, pixels)
        .ok_or_else(|| ConvertError::Decode("HEIF plane has the wrong size".to_string()))?;
    debug!(
        path = %path.display(),
        width = plane.width,
        height = plane.height,
        "Decoded HEIF image"
    );

    Ok(DecodedImage::upright(DynamicImage::ImageRgb8(image)))
}

#[cfg(not(feature = "heic"))]
pub fn decode(path: &Path) -> Result<DecodedImage> {
    let mut header = [0u8; 12];
    let read = {
        use std::io::Read;
        let mut file = std::fs::File::open(path)?;
        file.read(&mut header)?
    };
    let reason = match sniff_heif_brand(&header[..read]) {
        Some(brand) => format!("HEIF ({}) support is not compiled in", brand),
        None => "not a HEIF container".to_string(),
    };
    Err(ConvertError::UnsupportedFormat(reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut bytes = vec![0, 0, 0, 24];
        bytes.extend_from_slice(b"ftyp");
        bytes.extend_from_slice(brand);
        bytes.extend_from_slice(&[0u8; 12]);
        bytes
    }

    #[test]
    fn test_sniff_heif_brand() {
        assert_eq!(sniff_heif_brand(&ftyp(b"heic")).as_deref(), Some("heic"));
        assert_eq!(sniff_heif_brand(&ftyp(b"mif1")).as_deref(), Some("mif1"));
        assert_eq!(sniff_heif_brand(&ftyp(b"isom")), None);
        assert_eq!(sniff_heif_brand(b"short"), None);
    }

    #[test]
    fn test_garbage_heic_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_0001.heic");
        std::fs::write(&path, b"this is not an ISOBMFF file at all").unwrap();

        let err = decode(&path).unwrap_err();
        assert!(
            matches!(err, ConvertError::UnsupportedFormat(_)),
            "got {:?}",
            err
        );
    }

    /// Encodes a solid-color image with whichever HEIF encoder plugin the
    /// installed libheif provides.
    #[cfg(feature = "heic")]
    fn encode_heif(width: u32, height: u32, rgb: [u8; 3]) -> Option<Vec<u8>> {
        use libheif_rs::{
            Channel, ColorSpace, CompressionFormat, EncoderQuality, HeifContext, Image, LibHeif,
            RgbChroma,
        };

        let mut image = Image::new(width, height, ColorSpace::Rgb(RgbChroma::Rgb)).ok()?;
        image
            .create_plane(Channel::Interleaved, width, height, 24)
            .ok()?;
        let plane = image.planes_mut().interleaved?;
        let stride = plane.stride;
        let data = plane.data;
        for y in 0..height as usize {
            for x in 0..width as usize {
                let px = y * stride + x * 3;
                data[px..px + 3].copy_from_slice(&rgb);
            }
        }

        let lib = LibHeif::new();
        let mut encoder = [CompressionFormat::Hevc, CompressionFormat::Av1]
            .into_iter()
            .find_map(|format| lib.encoder_for_format(format).ok())?;
        encoder.set_quality(EncoderQuality::Lossy(95)).ok()?;
        let mut ctx = HeifContext::new().ok()?;
        ctx.encode_image(&image, &mut encoder, None).ok()?;
        ctx.write_to_bytes().ok()
    }

    #[cfg(feature = "heic")]
    #[test]
    fn test_encoded_heif_decodes_to_upright_rgb() {
        let Some(bytes) = encode_heif(64, 48, [200, 120, 40]) else {
            eprintln!("libheif has no HEVC or AV1 encoder plugin, nothing to decode");
            return;
        };
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_0002.heic");
        std::fs::write(&path, bytes).unwrap();

        let decoded = decode(&path).unwrap();
        assert_eq!(decoded.orientation, image::metadata::Orientation::NoTransforms);
        let rgb = decoded.image.to_rgb8();
        assert_eq!(rgb.dimensions(), (64, 48));

        let center = rgb.get_pixel(32, 24).0;
        for (got, want) in center.iter().zip([200u8, 120, 40]) {
            assert!(got.abs_diff(want) <= 12, "pixel {:?} too far from target", center);
        }
    }
}
