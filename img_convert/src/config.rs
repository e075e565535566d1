//! Run configuration.
//!
//! A [`RunConfig`] is built once at startup, validated with
//! [`RunConfig::validate`], and then shared read-only by every worker.

use crate::encoder::SearchParams;
use crate::formats::{known_extensions, SourceFormat};
use clap::ValueEnum;
use serde::Serialize;
use shared_utils::common_utils::normalize_extension;
use shared_utils::{FileSize, FileSizeParseError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Source extensions used when none are given.
pub const DEFAULT_SOURCE_FORMATS: &[&str] = &["heic", "jpg", "jpeg", "nef", "png", "tiff"];

/// Files at or below this size are copied instead of converted.
pub const DEFAULT_THRESHOLD: &str = "1Mb";

/// Fatal configuration problems, reported before any file is touched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("source directory does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("source path is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("destination {dest} must not be the source directory or inside it ({source_root})")]
    DestinationInsideSource { source_root: PathBuf, dest: PathBuf },

    #[error("no source formats selected")]
    NoSourceFormats,

    #[error("unknown source format: {format} (known: {known})")]
    UnknownSourceFormat { format: String, known: String },

    #[error("invalid value for {option}: {source}")]
    InvalidSize {
        option: &'static str,
        #[source]
        source: FileSizeParseError,
    },

    #[error("invalid quality range {min}..={max} (expected 1 <= min <= max <= 100)")]
    InvalidQualityRange { min: u8, max: u8 },

    #[error("invalid default quality {0} (expected 1..=100)")]
    InvalidDefaultQuality(u8),

    #[error("quality search needs at least one iteration")]
    ZeroIterations,

    #[error("quality search iterations {requested} exceed the limit of {limit}")]
    TooManyIterations { requested: u32, limit: u32 },
}

/// Output encoding. Both variants produce baseline JPEG and differ only in
/// the file suffix written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Jpg,
    Jpeg,
}

impl TargetFormat {
    /// Suffix without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Jpg => "jpg",
            TargetFormat::Jpeg => "jpeg",
        }
    }

    /// True when files with extension `ext` already hold this encoding.
    pub fn matches_extension(&self, ext: &str) -> bool {
        matches!(normalize_extension(ext).as_str(), "jpg" | "jpeg" | "jpe" | "jfif")
    }
}

/// Output size bounds. Zero means "unconstrained" for both fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeConstraint {
    /// Best-effort ceiling for the encoded output, in bytes.
    pub max_bytes: u64,
    /// Longest side of the output, in pixels.
    pub max_dimension: u32,
}

impl SizeConstraint {
    pub fn byte_ceiling(&self) -> Option<u64> {
        (self.max_bytes > 0).then_some(self.max_bytes)
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub overwrite: bool,
    /// Files of at most this many bytes are copied verbatim.
    pub threshold_bytes: u64,
    /// Normalized (lowercase, no dot) source extensions.
    pub source_extensions: Vec<String>,
    pub target_format: TargetFormat,
    pub constraint: SizeConstraint,
    /// Pool size; `0` resolves to the number of logical CPUs.
    pub workers: usize,
    pub search: SearchParams,
}

impl RunConfig {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            overwrite: false,
            threshold_bytes: 1_000_000,
            source_extensions: DEFAULT_SOURCE_FORMATS.iter().map(|s| s.to_string()).collect(),
            target_format: TargetFormat::Jpg,
            constraint: SizeConstraint::default(),
            workers: 0,
            search: SearchParams::default(),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_threshold(mut self, bytes: u64) -> Self {
        self.threshold_bytes = bytes;
        self
    }

    pub fn with_source_formats<S: AsRef<str>>(mut self, formats: &[S]) -> Self {
        let mut exts: Vec<String> = formats
            .iter()
            .map(|f| normalize_extension(f.as_ref()))
            .filter(|f| !f.is_empty())
            .collect();
        exts.sort();
        exts.dedup();
        self.source_extensions = exts;
        self
    }

    pub fn with_target_format(mut self, format: TargetFormat) -> Self {
        self.target_format = format;
        self
    }

    pub fn with_max_dimension(mut self, pixels: u32) -> Self {
        self.constraint.max_dimension = pixels;
        self
    }

    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.constraint.max_bytes = bytes;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_search(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    /// Checks everything that would make the whole run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source_root.exists() {
            return Err(ConfigError::SourceNotFound(self.source_root.clone()));
        }
        if !self.source_root.is_dir() {
            return Err(ConfigError::SourceNotDirectory(self.source_root.clone()));
        }

        let source = absolute(&self.source_root);
        let dest = absolute(&self.dest_root);
        if dest.starts_with(&source) {
            return Err(ConfigError::DestinationInsideSource {
                source_root: self.source_root.clone(),
                dest: self.dest_root.clone(),
            });
        }

        if self.source_extensions.is_empty() {
            return Err(ConfigError::NoSourceFormats);
        }
        if let Some(unknown) = self
            .source_extensions
            .iter()
            .find(|ext| SourceFormat::from_extension(ext).is_none())
        {
            return Err(ConfigError::UnknownSourceFormat {
                format: unknown.clone(),
                known: known_extensions().collect::<Vec<_>>().join(", "),
            });
        }

        self.search.validate()
    }
}

/// Parses a human-readable size option (`1Mb`, `500 kB`, ...). An empty
/// string means "unset" and yields zero.
pub fn parse_size_option(option: &'static str, value: &str) -> Result<u64, ConfigError> {
    if value.trim().is_empty() {
        return Ok(0);
    }
    FileSize::parse(value)
        .map(|s| s.bytes())
        .map_err(|source| ConfigError::InvalidSize { option, source })
}

/// Canonical path when it exists; otherwise resolved against the nearest
/// existing ancestor so that not-yet-created destinations compare correctly.
fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let base = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = base.as_path();
    let mut tail = Vec::new();
    while let Some(parent) = existing.parent() {
        if let Some(name) = existing.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            let mut resolved = canonical;
            for part in tail.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        existing = parent;
    }
    base
}
