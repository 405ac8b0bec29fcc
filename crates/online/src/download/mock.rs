//! In-memory downloader for testing.

use super::Downloader;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
enum Behaviour {
    Serve(Vec<u8>),
    Fail,
    Truncate(Vec<u8>),
}

/// Scripted [`Downloader`] that writes fixed bytes (or fails) without any
/// network access.
///
/// # Examples
///
/// ```
/// use setsync_online::Downloader;
/// use setsync_online::download::MockDownloader;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let dir = tempfile::tempdir().unwrap();
/// let destination = dir.path().join("snapshot.bz2");
///
/// let downloader = MockDownloader::serving(b"payload".to_vec());
/// downloader.download("https://example.com/snapshot.bz2", &destination).await.unwrap();
/// assert_eq!(std::fs::read(&destination).unwrap(), b"payload");
/// assert_eq!(downloader.call_count(), 1);
/// # }
/// ```
pub struct MockDownloader {
    behaviour: Behaviour,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}
impl MockDownloader {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every download succeeds and writes `bytes` to the destination.
    pub fn serving(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with(Behaviour::Serve(bytes.into()))
    }

    /// Every download fails before anything is written.
    pub fn failing() -> Self {
        Self::with(Behaviour::Fail)
    }

    /// Every download writes `bytes` and then fails, like a dropped connection.
    pub fn truncated(bytes: impl Into<Vec<u8>>) -> Self {
        Self::with(Behaviour::Truncate(bytes.into()))
    }

    /// Hold every download until a permit is handed out with [`release`](Self::release).
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Downloader for MockDownloader {
    async fn download(&self, _url: &str, destination: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        match &self.behaviour {
            Behaviour::Serve(bytes) => tokio::fs::write(destination, bytes).await.or_raise(|| ErrorKind::Io),
            Behaviour::Fail => exn::bail!(ErrorKind::Status(503)),
            Behaviour::Truncate(bytes) => {
                tokio::fs::write(destination, bytes).await.or_raise(|| ErrorKind::Io)?;
                exn::bail!(ErrorKind::Network)
            },
        }
    }
}
