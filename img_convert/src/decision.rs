//! Per-file policy: skip, copy, or convert.
//!
//! [`decide`] only reads the file's size and probes the destination;
//! [`execute`] then performs the chosen action and never panics on bad
//! input, returning `Failed` instead.

use crate::config::RunConfig;
use crate::encoder::SizeTargetingEncoder;
use crate::error::{ConvertError, Result};
use crate::formats::SourceFormat;
use crate::normalize::normalize;
use crate::resize::resize;
use serde::Serialize;
use shared_utils::common_utils::{copy_atomic, write_atomic};
use shared_utils::SourceFile;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DestinationExists,
    /// Another source file in the same run maps to the same output.
    DuplicateDestination,
    Cancelled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DestinationExists => "destination exists",
            SkipReason::DuplicateDestination => "duplicate destination",
            SkipReason::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Skip { dest: PathBuf, reason: SkipReason },
    Copy { dest: PathBuf },
    Convert { dest: PathBuf },
}

impl Action {
    pub fn dest(&self) -> &Path {
        match self {
            Action::Skip { dest, .. } | Action::Copy { dest } | Action::Convert { dest } => dest,
        }
    }
}

/// Exactly one per source file.
#[derive(Debug)]
pub enum ConversionOutcome {
    Skipped(SkipReason),
    Copied {
        dest: PathBuf,
        bytes: u64,
    },
    Converted {
        dest: PathBuf,
        bytes: u64,
        quality: u8,
        target_met: bool,
        width: u32,
        height: u32,
    },
    Failed(ConvertError),
}

impl ConversionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ConversionOutcome::Skipped(_) => "skipped",
            ConversionOutcome::Copied { .. } => "copied",
            ConversionOutcome::Converted { .. } => "converted",
            ConversionOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConversionOutcome::Failed(_))
    }
}

/// Output path for a copy: the target suffix when the source is already in
/// the target codec, the source's own extension otherwise.
pub fn copy_destination(file: &SourceFile, config: &RunConfig) -> PathBuf {
    let dest = config.dest_root.join(&file.relative);
    if config.target_format.matches_extension(&file.extension) {
        dest.with_extension(config.target_format.extension())
    } else {
        dest
    }
}

/// Output path for a conversion: the source's relative path with the
/// target suffix.
pub fn convert_destination(file: &SourceFile, config: &RunConfig) -> PathBuf {
    config
        .dest_root
        .join(&file.relative)
        .with_extension(config.target_format.extension())
}

pub fn decide(file: &SourceFile, config: &RunConfig) -> Action {
    let copy = file.size <= config.threshold_bytes;
    let dest = if copy {
        copy_destination(file, config)
    } else {
        convert_destination(file, config)
    };

    if !config.overwrite && dest.exists() {
        Action::Skip {
            dest,
            reason: SkipReason::DestinationExists,
        }
    } else if copy {
        Action::Copy { dest }
    } else {
        Action::Convert { dest }
    }
}

pub fn execute(
    file: &SourceFile,
    action: &Action,
    config: &RunConfig,
    encoder: &SizeTargetingEncoder,
) -> ConversionOutcome {
    let result = match action {
        Action::Skip { reason, .. } => return ConversionOutcome::Skipped(*reason),
        Action::Copy { dest } => copy_file(file, dest),
        Action::Convert { dest } => convert_file(file, dest, config, encoder),
    };
    result.unwrap_or_else(ConversionOutcome::Failed)
}

fn create_parent(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn copy_file(file: &SourceFile, dest: &Path) -> Result<ConversionOutcome> {
    create_parent(dest)?;
    let bytes = copy_atomic(&file.path, dest)?;
    Ok(ConversionOutcome::Copied {
        dest: dest.to_path_buf(),
        bytes,
    })
}

fn convert_file(
    file: &SourceFile,
    dest: &Path,
    config: &RunConfig,
    encoder: &SizeTargetingEncoder,
) -> Result<ConversionOutcome> {
    let format = SourceFormat::from_extension(&file.extension).ok_or_else(|| {
        ConvertError::UnsupportedFormat(format!("no decoder for .{}", file.extension))
    })?;

    let decoded = format.decode(&file.path)?;
    let raster = resize(normalize(decoded), config.constraint.max_dimension);
    let (width, height) = raster.dimensions();
    let encoded = encoder.encode(&raster, config.constraint.byte_ceiling())?;
    drop(raster);

    create_parent(dest)?;
    write_atomic(dest, &encoded.bytes)?;

    Ok(ConversionOutcome::Converted {
        dest: dest.to_path_buf(),
        bytes: encoded.len(),
        quality: encoded.quality,
        target_met: encoded.target_met,
        width,
        height,
    })
}
