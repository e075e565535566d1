//! Source format dispatch.
//!
//! Every accepted extension maps to exactly one [`SourceFormat`], and each
//! variant owns its decode path.

use crate::decode::{self, DecodedImage};
use crate::error::Result;
use shared_utils::common_utils::normalize_extension;
use std::path::Path;

/// Extensions decoded by the `image` crate.
pub const STANDARD_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "jfif", "png", "tif", "tiff", "webp", "gif", "bmp",
];

/// Camera RAW extensions decoded through rawloader.
pub const RAW_EXTENSIONS: &[&str] = &[
    "nef", "nrw", "cr2", "arw", "dng", "orf", "rw2", "raf", "pef", "srw",
];

/// HEIF containers. Whether a given file decodes depends on the codec inside
/// it and on the build.
pub const HEIF_EXTENSIONS: &[&str] = &["heic", "heif", "hif"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Standard,
    Raw,
    Heif,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = normalize_extension(ext);
        let ext = ext.as_str();
        if STANDARD_EXTENSIONS.contains(&ext) {
            Some(SourceFormat::Standard)
        } else if RAW_EXTENSIONS.contains(&ext) {
            Some(SourceFormat::Raw)
        } else if HEIF_EXTENSIONS.contains(&ext) {
            Some(SourceFormat::Heif)
        } else {
            None
        }
    }

    pub fn decode(&self, path: &Path) -> Result<DecodedImage> {
        match self {
            SourceFormat::Standard => decode::standard::decode(path),
            SourceFormat::Raw => decode::raw::decode(path),
            SourceFormat::Heif => decode::heif::decode(path),
        }
    }
}

/// Every extension the decoder knows about, for CLI help and validation.
pub fn known_extensions() -> impl Iterator<Item = &'static str> {
    STANDARD_EXTENSIONS
        .iter()
        .chain(RAW_EXTENSIONS)
        .chain(HEIF_EXTENSIONS)
        .copied()
}
