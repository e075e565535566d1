//! Shared Utilities for the quick_pose image tools
//!
//! - File discovery and batch tallies
//! - Worker pool abstraction
//! - Atomic output writes
//! - Logging, progress bar and summary reporting
//! - Byte-size parsing and iteration guards

pub mod batch;
pub mod common_utils;
pub mod executor;
pub mod logging;
pub mod progress;
pub mod report;
pub mod thread_manager;
pub mod types;

pub use batch::{BatchResult, FileSelector, SourceFile};
pub use executor::{CancelFlag, Executor, RayonExecutor, SequentialExecutor};
pub use progress::{create_progress_bar, format_bytes, format_duration};
pub use report::{print_summary_report, render_summary_report};
pub use types::{
    FileSize, FileSizeParseError, IterationError, IterationGuard, HARD_ITERATION_CAP,
};
