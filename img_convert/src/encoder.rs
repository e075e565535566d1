//! JPEG encoding with an optional byte ceiling.
//!
//! Without a ceiling the raster is encoded once at the default quality. With
//! one, a bounded binary search over quality looks for the highest quality
//! whose output fits. Every attempt is encoded in memory and the winning
//! bytes are returned as-is, so the caller writes exactly what was measured.

use crate::config::ConfigError;
use crate::error::{ConvertError, Result};
use crate::normalize::Raster;
use image::codecs::jpeg::JpegEncoder;
use serde::Serialize;
use shared_utils::{IterationGuard, HARD_ITERATION_CAP};
use tracing::{debug, warn};

/// Quality search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchParams {
    /// Used when no byte ceiling is set.
    pub default_quality: u8,
    pub min_quality: u8,
    pub max_quality: u8,
    pub max_iterations: u32,
    /// A fitting result this close to the ceiling ends the search early.
    pub tolerance_bytes: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            default_quality: 75,
            min_quality: 20,
            max_quality: 95,
            max_iterations: 10,
            tolerance_bytes: 3000,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.min_quality == 0 || self.min_quality > self.max_quality || self.max_quality > 100 {
            return Err(ConfigError::InvalidQualityRange {
                min: self.min_quality,
                max: self.max_quality,
            });
        }
        if self.default_quality == 0 || self.default_quality > 100 {
            return Err(ConfigError::InvalidDefaultQuality(self.default_quality));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.max_iterations > HARD_ITERATION_CAP {
            return Err(ConfigError::TooManyIterations {
                requested: self.max_iterations,
                limit: HARD_ITERATION_CAP,
            });
        }
        Ok(())
    }
}

/// Result of encoding one raster.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub quality: u8,
    /// False when a ceiling was set and no evaluated quality fit under it.
    pub target_met: bool,
    /// Number of encodes performed.
    pub iterations: u32,
}

impl EncodedImage {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SizeTargetingEncoder {
    params: SearchParams,
}

impl SizeTargetingEncoder {
    pub fn new(params: SearchParams) -> Self {
        Self { params }
    }

    /// Encodes `raster` as baseline JPEG, keeping the output at or below
    /// `max_bytes` when some quality in range allows it.
    pub fn encode(&self, raster: &Raster, max_bytes: Option<u64>) -> Result<EncodedImage> {
        match max_bytes {
            None => {
                let quality = self.params.default_quality;
                let bytes = encode_jpeg(raster, quality)?;
                Ok(EncodedImage {
                    bytes,
                    quality,
                    target_met: true,
                    iterations: 1,
                })
            }
            Some(ceiling) => self.search(ceiling, |q| encode_jpeg(raster, q)),
        }
    }

    /// Binary search over quality with an arbitrary encode function.
    pub fn search<F>(&self, ceiling: u64, mut encode: F) -> Result<EncodedImage>
    where
        F: FnMut(u8) -> Result<Vec<u8>>,
    {
        let params = &self.params;
        let mut lo = u32::from(params.min_quality);
        let mut hi = u32::from(params.max_quality);
        let mut guard = IterationGuard::new(params.max_iterations, "jpeg quality search");

        // Highest quality that fit, and lowest quality that did not.
        let mut best: Option<(u8, Vec<u8>)> = None;
        let mut smallest: Option<(u8, Vec<u8>)> = None;

        while lo <= hi {
            if guard.increment().is_err() {
                debug!(ceiling, budget = guard.budget(), "Quality search hit its iteration bound");
                break;
            }
            let q = ((lo + hi) / 2) as u8;
            let bytes = encode(q)?;
            let size = bytes.len() as u64;
            debug!(quality = q, size, ceiling, lo, hi, "Quality search step");

            if size <= ceiling {
                let close_enough = ceiling - size < params.tolerance_bytes;
                best = Some((q, bytes));
                if close_enough {
                    break;
                }
                lo = u32::from(q) + 1;
            } else {
                if smallest.as_ref().map_or(true, |(sq, _)| q < *sq) {
                    smallest = Some((q, bytes));
                }
                if q == 0 {
                    break;
                }
                hi = u32::from(q) - 1;
            }
        }
        let iterations = guard.used();

        if let Some((quality, bytes)) = best {
            return Ok(EncodedImage {
                bytes,
                quality,
                target_met: true,
                iterations,
            });
        }

        let (quality, bytes) = match smallest {
            Some(attempt) => attempt,
            None => (params.min_quality, encode(params.min_quality)?),
        };
        warn!(
            ceiling,
            size = bytes.len(),
            quality,
            "No quality fits under the size ceiling; keeping the smallest attempt"
        );
        Ok(EncodedImage {
            bytes,
            quality,
            target_met: false,
            iterations,
        })
    }
}

fn encode_jpeg(raster: &Raster, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(raster.as_rgb())
        .map_err(ConvertError::from_encode)?;
    Ok(buf)
}
