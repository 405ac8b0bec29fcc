use super::Downloader;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// Streams an HTTP(S) response body straight to disk.
///
/// Only the connection is bounded by a timeout; the body itself may take as
/// long as it needs, since snapshots can be large.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}
impl HttpDownloader {
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    #[instrument(skip_all, fields(url = %url, destination = %destination.display(), bytes))]
    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let mut response = self.client.get(url).send().await.or_raise(|| ErrorKind::Network)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }

        let mut file = File::create(destination).await.or_raise(|| ErrorKind::Io)?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.or_raise(|| ErrorKind::Network)? {
            file.write_all(&chunk).await.or_raise(|| ErrorKind::Io)?;
            written += chunk.len() as u64;
        }
        file.flush().await.or_raise(|| ErrorKind::Io)?;
        file.sync_all().await.or_raise(|| ErrorKind::Io)?;

        tracing::Span::current().record("bytes", written);
        tracing::debug!("download complete");
        Ok(())
    }
}
