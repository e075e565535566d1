//! Type-Safe Wrappers Module
//!
//! - `file_size`: byte counts and human-readable size parsing
//! - `iteration`: iteration budget guard

pub mod file_size;
pub mod iteration;

pub use file_size::{FileSize, FileSizeParseError};
pub use iteration::{IterationError, IterationGuard, HARD_ITERATION_CAP};
