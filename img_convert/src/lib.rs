//! img_convert - batch image normalizer
//!
//! Walks a source tree of standard, camera RAW and HEIF images and writes a
//! mirrored tree of JPEGs, optionally bounded in dimension and byte size.
//! Small files are copied verbatim; existing outputs are left alone unless
//! overwriting is requested.

pub mod config;
pub mod decision;
pub mod decode;
pub mod encoder;
pub mod error;
pub mod formats;
pub mod normalize;
pub mod resize;
pub mod runner;

pub use config::{parse_size_option, ConfigError, RunConfig, SizeConstraint, TargetFormat};
pub use decision::{decide, execute, Action, ConversionOutcome, SkipReason};
pub use decode::DecodedImage;
pub use encoder::{EncodedImage, SearchParams, SizeTargetingEncoder};
pub use error::{ConvertError, Result};
pub use formats::SourceFormat;
pub use normalize::{normalize, Raster};
pub use resize::{fit_within, resize};
pub use runner::{BatchReport, BatchRunner, FileRecord, FileReport};
