//! Camera RAW decoding.
//!
//! rawloader hands back the undeveloped sensor data. [`develop`] turns it
//! into display-referred RGB8 with a 2x2 super-pixel demosaic: every Bayer
//! quad becomes one output pixel, so the result is half the sensor size in
//! each direction. That is plenty for the downscaled outputs this tool
//! produces and avoids interpolation artifacts.

use super::DecodedImage;
use crate::error::{ConvertError, Result};
use image::metadata::Orientation;
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

/// Sensor samples as stored by the camera.
#[derive(Debug, Clone, Copy)]
pub enum Samples<'a> {
    Integer(&'a [u16]),
    /// Already scaled to 0.0..=1.0 by the decoder.
    Float(&'a [f32]),
}

impl Samples<'_> {
    fn len(&self) -> usize {
        match self {
            Samples::Integer(d) => d.len(),
            Samples::Float(d) => d.len(),
        }
    }
}

/// Everything [`develop`] needs from a RAW file, detached from rawloader so
/// it can be built by hand.
#[derive(Debug, Clone)]
pub struct SensorFrame<'a> {
    pub width: usize,
    pub height: usize,
    /// Components per pixel: 1 for a mosaic, 3 for linear RGB.
    pub cpp: usize,
    pub samples: Samples<'a>,
    /// Per CFA color (R, G, B, E).
    pub black_levels: [u16; 4],
    pub white_levels: [u16; 4],
    pub wb_coeffs: [f32; 4],
    /// Top, right, bottom, left.
    pub crops: [usize; 4],
}

pub fn decode(path: &Path) -> Result<DecodedImage> {
    let raw = rawloader::decode_file(path).map_err(|e| ConvertError::Decode(e.to_string()))?;

    let samples = match raw.data {
        rawloader::RawImageData::Integer(ref data) => Samples::Integer(data),
        rawloader::RawImageData::Float(ref data) => Samples::Float(data),
    };
    let frame = SensorFrame {
        width: raw.width,
        height: raw.height,
        cpp: raw.cpp,
        samples,
        black_levels: raw.blacklevels,
        white_levels: raw.whitelevels,
        wb_coeffs: raw.wb_coeffs,
        crops: raw.crops,
    };

    let rgb = develop(&frame, |row, col| raw.cfa.color_at(row, col))?;
    let orientation = map_orientation(raw.orientation);

    debug!(
        path = %path.display(),
        camera = %format!("{} {}", raw.make, raw.model),
        sensor_width = raw.width,
        sensor_height = raw.height,
        width = rgb.width(),
        height = rgb.height(),
        ?orientation,
        "Developed RAW image"
    );
    Ok(DecodedImage::with_orientation(DynamicImage::ImageRgb8(rgb), orientation))
}

fn map_orientation(orientation: rawloader::Orientation) -> Orientation {
    let exif = match orientation {
        rawloader::Orientation::Normal | rawloader::Orientation::Unknown => 1,
        rawloader::Orientation::HorizontalFlip => 2,
        rawloader::Orientation::Rotate180 => 3,
        rawloader::Orientation::VerticalFlip => 4,
        rawloader::Orientation::Transpose => 5,
        rawloader::Orientation::Rotate90 => 6,
        rawloader::Orientation::Transverse => 7,
        rawloader::Orientation::Rotate270 => 8,
    };
    Orientation::from_exif(exif).unwrap_or(Orientation::NoTransforms)
}

/// Develops sensor data into sRGB.
///
/// `color_at(row, col)` returns the CFA color index (0 red, 1 green, 2 blue,
/// 3 emerald/second green) of the photosite at absolute sensor coordinates.
pub fn develop<F>(frame: &SensorFrame<'_>, color_at: F) -> Result<RgbImage>
where
    F: Fn(usize, usize) -> usize + Sync,
{
    let [top, right, bottom, left] = frame.crops;
    let visible_w = frame.width.saturating_sub(left + right);
    let visible_h = frame.height.saturating_sub(top + bottom);

    if frame.samples.len() < frame.width * frame.height * frame.cpp {
        return Err(ConvertError::Decode(format!(
            "sensor data holds {} samples, expected {}x{}x{}",
            frame.samples.len(),
            frame.width,
            frame.height,
            frame.cpp
        )));
    }

    let wb = white_balance(frame.wb_coeffs);
    let (out_w, out_h) = match frame.cpp {
        1 => (visible_w / 2, visible_h / 2),
        3 => (visible_w, visible_h),
        n => {
            return Err(ConvertError::UnsupportedFormat(format!(
                "RAW with {} components per pixel",
                n
            )))
        }
    };
    if out_w == 0 || out_h == 0 {
        return Err(ConvertError::Decode(format!(
            "RAW visible area {}x{} is too small",
            visible_w, visible_h
        )));
    }

    let level = |idx: usize, color: usize| -> f32 {
        match frame.samples {
            Samples::Integer(data) => {
                let black = frame.black_levels[color] as f32;
                let white = frame.white_levels[color] as f32;
                let range = if white > black { white - black } else { 1.0 };
                (data[idx] as f32 - black) / range
            }
            Samples::Float(data) => data[idx],
        }
    };

    let mut buf = vec![0u8; out_w * out_h * 3];
    buf.par_chunks_exact_mut(out_w * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..out_w {
                let mut rgb = [0.0f32; 3];
                if frame.cpp == 3 {
                    let idx = ((top + y) * frame.width + left + x) * 3;
                    for (c, value) in rgb.iter_mut().enumerate() {
                        *value = level(idx + c, c) * wb[c];
                    }
                } else {
                    let mut sum = [0.0f32; 3];
                    let mut count = [0u32; 3];
                    for dy in 0..2 {
                        for dx in 0..2 {
                            let r = top + 2 * y + dy;
                            let c = left + 2 * x + dx;
                            let color = color_at(r, c).min(3);
                            let channel = if color == 3 { 1 } else { color };
                            sum[channel] += level(r * frame.width + c, color) * wb[channel];
                            count[channel] += 1;
                        }
                    }
                    for channel in 0..3 {
                        if count[channel] > 0 {
                            rgb[channel] = sum[channel] / count[channel] as f32;
                        }
                    }
                }
                for c in 0..3 {
                    row[x * 3 + c] = to_srgb8(rgb[c]);
                }
            }
        });

    RgbImage::from_raw(out_w as u32, out_h as u32, buf)
        .ok_or_else(|| ConvertError::Decode("developed buffer has the wrong size".to_string()))
}

/// Camera multipliers normalized to green. Missing or nonsensical values
/// fall back to neutral.
fn white_balance(coeffs: [f32; 4]) -> [f32; 3] {
    let green = coeffs[1];
    if !green.is_finite() || green <= 0.0 {
        return [1.0; 3];
    }
    let mut wb = [1.0f32; 3];
    for c in [0, 2] {
        let v = coeffs[c] / green;
        if v.is_finite() && v > 0.0 {
            wb[c] = v;
        }
    }
    wb
}

fn to_srgb8(linear: f32) -> u8 {
    let v = if linear.is_finite() { linear.clamp(0.0, 1.0) } else { 0.0 };
    let encoded = if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const WHITE_LEVEL: u16 = 4095;

    /// Minimal uncompressed little-endian DNG: one IFD, 16-bit RGGB mosaic
    /// where every red, green and blue photosite reads `rgb`.
    pub fn synthetic_dng(width: u32, height: u32, orientation: u16, rgb: [u16; 3]) -> Vec<u8> {
        const BYTE: u16 = 1;
        const ASCII: u16 = 2;
        const SHORT: u16 = 3;
        const LONG: u16 = 4;
        const STRIP_OFFSETS: usize = 8;

        let short = |v: u16| v.to_le_bytes().to_vec();
        let long = |v: u32| v.to_le_bytes().to_vec();
        let make = b"Synthetic\0".to_vec();
        let model = b"Bayer Test\0".to_vec();

        // (tag, type, count, payload), sorted by tag
        let mut entries: Vec<(u16, u16, u32, Vec<u8>)> = vec![
            (0x00FE, LONG, 1, long(0)),
            (0x0100, LONG, 1, long(width)),
            (0x0101, LONG, 1, long(height)),
            (0x0102, SHORT, 1, short(16)),
            (0x0103, SHORT, 1, short(1)),
            (0x0106, SHORT, 1, short(32803)),
            (0x010F, ASCII, make.len() as u32, make),
            (0x0110, ASCII, model.len() as u32, model),
            (0x0111, LONG, 1, long(0)),
            (0x0112, SHORT, 1, short(orientation)),
            (0x0115, SHORT, 1, short(1)),
            (0x828E, BYTE, 4, vec![0, 1, 1, 2]),
            (0xC612, BYTE, 4, vec![1, 4, 0, 0]),
            (0xC61D, SHORT, 1, short(WHITE_LEVEL)),
        ];

        let data_start = 8 + 2 + entries.len() * 12 + 4;
        let mut extra = Vec::new();
        let mut offsets = Vec::new();
        for (_, _, _, payload) in &entries {
            if payload.len() > 4 {
                offsets.push(Some((data_start + extra.len()) as u32));
                extra.extend_from_slice(payload);
                if extra.len() % 2 == 1 {
                    extra.push(0);
                }
            } else {
                offsets.push(None);
            }
        }
        let strip = (data_start + extra.len()) as u32;
        entries[STRIP_OFFSETS].3 = long(strip);

        let mut out = Vec::new();
        out.extend_from_slice(b"II");
        out.extend_from_slice(&42u16.to_le_bytes());
        out.extend_from_slice(&8u32.to_le_bytes());
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for ((tag, typ, count, payload), offset) in entries.iter().zip(&offsets) {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&typ.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            match offset {
                Some(off) => out.extend_from_slice(&off.to_le_bytes()),
                None => {
                    let mut value = [0u8; 4];
                    value[..payload.len()].copy_from_slice(payload);
                    out.extend_from_slice(&value);
                }
            }
        }
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&extra);
        assert_eq!(out.len(), strip as usize);

        for row in 0..height {
            for col in 0..width {
                let value = match (row % 2, col % 2) {
                    (0, 0) => rgb[0],
                    (1, 1) => rgb[2],
                    _ => rgb[1],
                };
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WHITE: u16 = 4095;
    const BLACK: u16 = 64;

    fn rggb(row: usize, col: usize) -> usize {
        match (row % 2, col % 2) {
            (0, 0) => 0,
            (1, 1) => 2,
            _ => 1,
        }
    }

    fn frame(width: usize, height: usize, data: &[u16]) -> SensorFrame<'_> {
        SensorFrame {
            width,
            height,
            cpp: 1,
            samples: Samples::Integer(data),
            black_levels: [BLACK; 4],
            white_levels: [WHITE; 4],
            wb_coeffs: [1.0, 1.0, 1.0, f32::NAN],
            crops: [0; 4],
        }
    }

    /// Fills a mosaic where every red, green and blue photosite reads the
    /// given raw value.
    fn mosaic(width: usize, height: usize, r: u16, g: u16, b: u16) -> Vec<u16> {
        let mut data = vec![0u16; width * height];
        for row in 0..height {
            for col in 0..width {
                data[row * width + col] = match rggb(row, col) {
                    0 => r,
                    2 => b,
                    _ => g,
                };
            }
        }
        data
    }

    #[test]
    fn test_superpixel_halves_dimensions() {
        let data = mosaic(8, 6, WHITE, WHITE, WHITE);
        let rgb = develop(&frame(8, 6, &data), rggb).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert!(rgb.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_black_level_maps_to_zero() {
        let data = mosaic(4, 4, BLACK, BLACK, BLACK);
        let rgb = develop(&frame(4, 4, &data), rggb).unwrap();
        assert!(rgb.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_channels_follow_the_cfa() {
        let data = mosaic(4, 4, WHITE, BLACK, BLACK);
        let rgb = develop(&frame(4, 4, &data), rggb).unwrap();
        assert!(rgb.pixels().all(|p| p.0 == [255, 0, 0]));
    }

    #[test]
    fn test_white_balance_scales_red_and_blue() {
        let mid = BLACK + (WHITE - BLACK) / 4;
        let data = mosaic(4, 4, mid, mid, mid);
        let mut balanced = frame(4, 4, &data);
        balanced.wb_coeffs = [2.0, 1.0, 1.0, f32::NAN];

        let rgb = develop(&balanced, rggb).unwrap();
        let p = rgb.get_pixel(0, 0).0;
        assert!(p[0] > p[1], "red should be boosted: {:?}", p);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_crops_are_honored() {
        let data = mosaic(10, 8, WHITE, WHITE, WHITE);
        let mut cropped = frame(10, 8, &data);
        cropped.crops = [2, 2, 0, 2];
        let rgb = develop(&cropped, rggb).unwrap();
        assert_eq!(rgb.dimensions(), (3, 3));
    }

    #[test]
    fn test_linear_rgb_keeps_full_resolution() {
        let data: Vec<u16> = [WHITE, BLACK, BLACK].repeat(6);
        let mut linear = frame(3, 2, &data);
        linear.cpp = 3;
        let rgb = develop(&linear, rggb).unwrap();
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(2, 1).0, [255, 0, 0]);
    }

    #[test]
    fn test_too_small_or_short_frames_fail() {
        let data = mosaic(1, 1, WHITE, WHITE, WHITE);
        assert!(matches!(
            develop(&frame(1, 1, &data), rggb),
            Err(ConvertError::Decode(_))
        ));

        let short = vec![0u16; 3];
        assert!(matches!(
            develop(&frame(4, 4, &short), rggb),
            Err(ConvertError::Decode(_))
        ));
    }

    #[test]
    fn test_srgb_curve_endpoints() {
        assert_eq!(to_srgb8(0.0), 0);
        assert_eq!(to_srgb8(1.0), 255);
        assert_eq!(to_srgb8(2.0), 255);
        assert_eq!(to_srgb8(f32::NAN), 0);
        assert!(to_srgb8(0.18) > 110, "mid grey brightens under gamma");
    }

    #[test]
    fn test_synthetic_dng_decodes_through_rawloader() {
        use super::fixtures::{synthetic_dng, WHITE_LEVEL};

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.dng");
        std::fs::write(&path, synthetic_dng(8, 6, 6, [WHITE_LEVEL, 0, 0])).unwrap();

        let decoded = decode(&path).unwrap();
        assert_eq!(decoded.orientation, Orientation::Rotate90);
        let rgb = decoded.image.to_rgb8();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert!(rgb.pixels().all(|p| p.0 == [255, 0, 0]), "got {:?}", rgb.get_pixel(0, 0));
    }

    #[test]
    fn test_garbage_raw_file_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("DSC_0001.nef");
        std::fs::write(&path, vec![0x5au8; 4096]).unwrap();

        let err = decode(&path).unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)), "got {:?}", err);
    }
}
