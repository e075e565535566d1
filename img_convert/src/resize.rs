//! Downsampling to a maximum dimension.

use crate::normalize::Raster;
use image::imageops::{self, FilterType};

/// Output dimensions for fitting `(width, height)` within `max_dimension`.
///
/// The longer side becomes `max_dimension`, the shorter one is scaled by the
/// same factor, rounded and kept at least 1. Zero, or an image that already
/// fits, leaves the dimensions unchanged.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if max_dimension == 0 || longest <= max_dimension {
        return (width, height);
    }
    let scale = |side: u32| -> u32 {
        if side == longest {
            max_dimension
        } else {
            let scaled = (side as u64 * max_dimension as u64 + longest as u64 / 2) / longest as u64;
            (scaled as u32).clamp(1, max_dimension)
        }
    };
    (scale(width), scale(height))
}

/// Downsamples with Lanczos3 when the raster exceeds `max_dimension`.
/// Never upsamples.
pub fn resize(raster: Raster, max_dimension: u32) -> Raster {
    let (width, height) = raster.dimensions();
    let (new_w, new_h) = fit_within(width, height, max_dimension);
    if (new_w, new_h) == (width, height) {
        return raster;
    }
    Raster::new(imageops::resize(
        raster.as_rgb(),
        new_w,
        new_h,
        FilterType::Lanczos3,
    ))
}
