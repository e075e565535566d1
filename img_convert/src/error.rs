//! Per-file conversion errors.
//!
//! Every variant is recovered at the batch level: the file is counted as
//! failed with its reason and the remaining files keep going.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    /// The format is recognized but this particular file (or codec variant)
    /// cannot be handled.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Corrupt or unreadable image data.
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A worker panicked while processing the file.
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl ConvertError {
    /// Short stable label used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::UnsupportedFormat(_) => "unsupported_format",
            ConvertError::Decode(_) => "decode",
            ConvertError::Encode(_) => "encode",
            ConvertError::Io(_) => "io",
            ConvertError::Panicked(_) => "panicked",
        }
    }

    /// Maps an `image` crate error raised while decoding.
    pub fn from_decode(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => ConvertError::UnsupportedFormat(e.to_string()),
            image::ImageError::IoError(e) => ConvertError::Io(e),
            other => ConvertError::Decode(other.to_string()),
        }
    }

    /// Maps an `image` crate error raised while encoding.
    pub fn from_encode(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => ConvertError::Io(e),
            other => ConvertError::Encode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
