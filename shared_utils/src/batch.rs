//! Batch Processing Module
//!
//! File discovery for batch runs plus the aggregated per-outcome tally.

use crate::common_utils::{
    compute_relative_path, get_extension_lowercase, has_extension, normalize_extension,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A candidate input discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the source root, used to mirror the output tree.
    pub relative: PathBuf,
    /// Lowercase, without the leading dot.
    pub extension: String,
    pub size: u64,
}

impl SourceFile {
    /// Builds a `SourceFile` by reading `path`'s metadata.
    pub fn from_path(path: &Path, root: &Path) -> std::io::Result<Self> {
        let size = std::fs::metadata(path)?.len();
        Ok(Self {
            path: path.to_path_buf(),
            relative: compute_relative_path(path, root),
            extension: get_extension_lowercase(path),
            size,
        })
    }
}

/// Recursive, extension-filtered walk over a source tree.
///
/// Holds no filesystem state: every call to [`FileSelector::iter`] walks the
/// tree again, so the sequence is restartable and always reflects the current
/// directory contents.
#[derive(Debug, Clone)]
pub struct FileSelector {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FileSelector {
    /// `extensions` are matched case-insensitively, with or without a
    /// leading dot.
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, extensions: &[S]) -> Self {
        let mut extensions: Vec<String> = extensions
            .iter()
            .map(|e| normalize_extension(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self {
            root: root.into(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Lazily yields matching regular files. Entries that cannot be read are
    /// logged and skipped.
    pub fn iter(&self) -> impl Iterator<Item = SourceFile> + '_ {
        WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| has_extension(e.path(), &self.extensions))
            .filter_map(|e| match SourceFile::from_path(e.path(), &self.root) {
                Ok(file) => Some(file),
                Err(err) => {
                    warn!(
                        path = %e.path().display(),
                        error = %err,
                        "Skipping file without metadata"
                    );
                    None
                }
            })
    }

    pub fn collect(&self) -> Vec<SourceFile> {
        self.iter().collect()
    }
}

/// Aggregated tally of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub copied: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, input_bytes: u64, output_bytes: u64) {
        self.total += 1;
        self.copied += 1;
        self.input_bytes += input_bytes;
        self.output_bytes += output_bytes;
    }

    pub fn convert(&mut self, input_bytes: u64, output_bytes: u64) {
        self.total += 1;
        self.converted += 1;
        self.input_bytes += input_bytes;
        self.output_bytes += output_bytes;
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn succeeded(&self) -> usize {
        self.copied + self.converted
    }

    /// Percentage of processed files that did not fail. Skipped files are
    /// excluded from the denominator; an empty batch is 100%.
    pub fn success_rate(&self) -> f64 {
        let processed = self.total - self.skipped;
        if processed == 0 {
            100.0
        } else {
            (self.succeeded() as f64 / processed as f64) * 100.0
        }
    }
}
