//! Online Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An online error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for online operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The online source is known to be unreachable; no request was made.
    #[display("online source is offline")]
    Offline,
    /// The HTTP client could not be constructed (bad configuration).
    #[display("could not build HTTP client")]
    Client,
    /// Connection, TLS or timeout failure while talking to the source.
    #[display("network error")]
    Network,
    /// The source answered with a non-success HTTP status.
    #[display("unexpected HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// The source answered successfully but the body couldn't be understood.
    #[display("invalid response body")]
    InvalidResponse,
    /// Writing a download to local disk failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::Io => true,
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Offline | Self::Client | Self::InvalidResponse => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Status(503).is_retryable());
        assert!(ErrorKind::Status(429).is_retryable());
        assert!(!ErrorKind::Status(404).is_retryable());
        assert!(!ErrorKind::Offline.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::Status(404).to_string(), "unexpected HTTP status 404");
    }
}
