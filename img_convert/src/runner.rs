//! Batch execution.
//!
//! Files are discovered, sorted and planned on the calling thread, then
//! executed on the [`Executor`]. Each work item returns its own outcome and
//! the report is assembled once the pool drains, so no counters are shared
//! between workers.

use crate::config::RunConfig;
use crate::decision::{decide, execute, Action, ConversionOutcome, SkipReason};
use crate::encoder::SizeTargetingEncoder;
use crate::error::ConvertError;
use indicatif::ProgressBar;
use serde::Serialize;
use shared_utils::{
    create_progress_bar, BatchResult, CancelFlag, Executor, FileSelector, SourceFile,
};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one source file.
#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    pub input_bytes: u64,
    pub outcome: ConversionOutcome,
}

/// Flattened, serializable view of a [`FileReport`].
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub source: PathBuf,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_met: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&FileReport> for FileRecord {
    fn from(report: &FileReport) -> Self {
        let mut record = FileRecord {
            source: report.source.clone(),
            outcome: report.outcome.label(),
            dest: None,
            bytes: None,
            quality: None,
            target_met: None,
            reason: None,
        };
        match &report.outcome {
            ConversionOutcome::Skipped(reason) => record.reason = Some(reason.as_str().to_string()),
            ConversionOutcome::Copied { dest, bytes } => {
                record.dest = Some(dest.clone());
                record.bytes = Some(*bytes);
            }
            ConversionOutcome::Converted {
                dest,
                bytes,
                quality,
                target_met,
                ..
            } => {
                record.dest = Some(dest.clone());
                record.bytes = Some(*bytes);
                record.quality = Some(*quality);
                record.target_met = Some(*target_met);
            }
            ConversionOutcome::Failed(err) => {
                record.reason = Some(format!("{}: {}", err.kind(), err));
            }
        }
        record
    }
}

/// Per-file outcomes of a run, in source path order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Aggregated counts plus every failure with its source path.
    pub fn summary(&self) -> BatchResult {
        let mut result = BatchResult::new();
        for file in &self.files {
            match &file.outcome {
                ConversionOutcome::Skipped(_) => result.skip(),
                ConversionOutcome::Copied { bytes, .. } => result.copy(file.input_bytes, *bytes),
                ConversionOutcome::Converted { bytes, .. } => {
                    result.convert(file.input_bytes, *bytes)
                }
                ConversionOutcome::Failed(err) => result.fail(file.source.clone(), err.to_string()),
            }
        }
        result
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| f.outcome.is_failed())
    }

    pub fn records(&self) -> Vec<FileRecord> {
        self.files.iter().map(FileRecord::from).collect()
    }
}

pub struct BatchRunner<E: Executor> {
    config: RunConfig,
    executor: E,
    encoder: SizeTargetingEncoder,
    cancel: CancelFlag,
    show_progress: bool,
}

impl<E: Executor> BatchRunner<E> {
    pub fn new(config: RunConfig, executor: E) -> Self {
        let encoder = SizeTargetingEncoder::new(config.search);
        Self {
            config,
            executor,
            encoder,
            cancel: CancelFlag::new(),
            show_progress: false,
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Walks the source tree and processes every matching file.
    pub fn run(&self) -> BatchReport {
        let selector = FileSelector::new(
            &self.config.source_root,
            self.config.source_extensions.as_slice(),
        );
        let files = selector.collect();
        info!(
            source = %selector.root().display(),
            extensions = ?selector.extensions(),
            files = files.len(),
            workers = self.executor.workers(),
            "Starting batch"
        );
        self.run_files(files)
    }

    /// Processes an already discovered file list.
    pub fn run_files(&self, files: Vec<SourceFile>) -> BatchReport {
        let (config, encoder) = (&self.config, &self.encoder);
        self.run_with(files, |file, action| execute(file, action, config, encoder))
    }

    /// Plans every file, then runs `work` for each non-skipped one.
    pub(crate) fn run_with<F>(&self, mut files: Vec<SourceFile>, work: F) -> BatchReport
    where
        F: Fn(&SourceFile, &Action) -> ConversionOutcome + Send + Sync,
    {
        let start = Instant::now();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let planned = self.plan(files);

        let progress = create_progress_bar(planned.len() as u64, "Converting", self.show_progress);
        let cancel = &self.cancel;

        let files = self.executor.map(planned, |(file, action)| {
            let outcome = if cancel.is_cancelled() {
                ConversionOutcome::Skipped(SkipReason::Cancelled)
            } else {
                run_isolated(&file, &action, &work)
            };
            log_outcome(&file, &outcome);
            finish_item(&progress, &file);
            FileReport {
                input_bytes: file.size,
                source: file.path,
                outcome,
            }
        });

        progress.finish_and_clear();
        let report = BatchReport {
            files,
            elapsed: start.elapsed(),
        };
        let summary = report.summary();
        info!(
            total = summary.total,
            converted = summary.converted,
            copied = summary.copied,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch finished"
        );
        report
    }

    /// Decides every file up front. Two sources that map to the same output
    /// (`a.png` and `a.tiff`) would race, so only the first in path order
    /// keeps its action.
    fn plan(&self, files: Vec<SourceFile>) -> Vec<(SourceFile, Action)> {
        let mut claimed = HashSet::new();
        files
            .into_iter()
            .map(|file| {
                let action = decide(&file, &self.config);
                if !claimed.insert(action.dest().to_path_buf()) {
                    let dest = action.dest().to_path_buf();
                    return (
                        file,
                        Action::Skip {
                            dest,
                            reason: SkipReason::DuplicateDestination,
                        },
                    );
                }
                (file, action)
            })
            .collect()
    }
}

/// Runs one item, turning a panic into that file's failure.
fn run_isolated<F>(file: &SourceFile, action: &Action, work: &F) -> ConversionOutcome
where
    F: Fn(&SourceFile, &Action) -> ConversionOutcome,
{
    match panic::catch_unwind(AssertUnwindSafe(|| work(file, action))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            ConversionOutcome::Failed(ConvertError::Panicked(message))
        }
    }
}

fn log_outcome(file: &SourceFile, outcome: &ConversionOutcome) {
    let path = file.path.display();
    match outcome {
        ConversionOutcome::Skipped(reason) => {
            info!(path = %path, reason = reason.as_str(), "Skipped");
        }
        ConversionOutcome::Copied { dest, bytes } => {
            info!(path = %path, dest = %dest.display(), bytes, "Copied");
        }
        ConversionOutcome::Converted {
            dest,
            bytes,
            quality,
            target_met,
            width,
            height,
        } => {
            info!(
                path = %path,
                dest = %dest.display(),
                input_bytes = file.size,
                bytes,
                quality,
                target_met,
                width,
                height,
                "Converted"
            );
        }
        ConversionOutcome::Failed(err) => {
            warn!(path = %path, kind = err.kind(), error = %err, "Failed");
        }
    }
}

fn finish_item(progress: &ProgressBar, file: &SourceFile) {
    if let Some(name) = file.path.file_name() {
        progress.set_message(name.to_string_lossy().into_owned());
    }
    progress.inc(1);
}
