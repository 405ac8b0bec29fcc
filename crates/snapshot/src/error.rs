//! Snapshot Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A snapshot error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Opening or querying the SQLite file failed (including corrupt files).
    #[display("database error")]
    Database,
    /// No snapshot file at the expected location.
    #[display("snapshot not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Refusing to write a snapshot over an existing file.
    #[display("snapshot already exists: {}", _0.display())]
    AlreadyExists(#[error(not(source))] PathBuf),
    /// A row (or a lookup parameter) couldn't be converted.
    #[display("invalid snapshot data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Snapshots are replaced wholesale rather than repaired, so a failed
    /// query against the same file will fail again.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
