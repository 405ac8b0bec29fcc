//! Whole-file downloads to local disk.

mod http;
#[cfg(feature = "mock")]
mod mock;

pub use self::http::HttpDownloader;
#[cfg(feature = "mock")]
pub use self::mock::MockDownloader;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Fetches a remote file to a local path.
///
/// A download either succeeds as a whole or fails. On failure the
/// destination may have been partially written; cleaning it up is the
/// caller's responsibility since only the caller knows what else depends
/// on that path.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, destination: &Path) -> Result<()>;
}
