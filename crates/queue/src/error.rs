//! Queue Error Types
//!
//! Nothing here ever reaches the caller of
//! [`UpdateQueue::update`](crate::UpdateQueue::update); these errors exist so
//! that bootstrap failures carry their cause into the log.

use derive_more::{Display, Error};

/// A queue error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fetching the compressed snapshot failed.
    #[display("snapshot download failed")]
    Download,
    /// The downloaded snapshot couldn't be decompressed, verified or moved into place.
    #[display("snapshot extraction failed")]
    Extraction,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Bootstrap is never retried within a process, but a later process may
    /// have better luck with a download; a broken archive will stay broken.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Download => true,
            Self::Extraction => false,
        }
    }
}
