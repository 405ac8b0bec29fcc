//! One-time acquisition of the local snapshot.
//!
//! When no snapshot exists locally, a background task downloads a compressed
//! copy next to where the snapshot belongs, decompresses it, checks that the
//! result is a readable snapshot and moves it into place. The outcome is
//! published exactly once through a [`watch`] channel; readers never wait for
//! it and treat anything other than [`BootstrapState::Ready`] as "no cache".
//!
//! Whatever happens, no temporary files are left behind:
//!
//! | Outcome            | `<snapshot>.<ext>` | `<snapshot>.partial` | `<snapshot>` |
//! |--------------------|--------------------|----------------------|--------------|
//! | success            | removed            | renamed              | present      |
//! | download failed    | removed            | never created        | absent       |
//! | extraction failed  | removed            | removed              | absent       |

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use setsync_compress::{Compression, extract_file};
use setsync_online::{DownloadHandle, Downloader};
use setsync_snapshot::Snapshot;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::instrument;

/// Progress of the snapshot bootstrap.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    /// A download or extraction is in progress.
    #[display("pending")]
    Pending,
    /// The snapshot is in place (it was already, or the bootstrap succeeded).
    #[display("ready")]
    Ready,
    /// The bootstrap failed; the snapshot stays absent for this process.
    #[display("failed")]
    Failed,
}
impl BootstrapState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Bootstraps started by this process, keyed by absolute snapshot path.
///
/// Every queue on the same path shares one job; two jobs would fight over
/// the same temporary files and could delete each other's snapshot.
static JOBS: LazyLock<Mutex<HashMap<PathBuf, Bootstrap>>> = LazyLock::new(Default::default);

/// Read side of the bootstrap: current state, snapshot location, and a way
/// to wait for the outcome.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    snapshot: Snapshot,
    state: watch::Receiver<BootstrapState>,
}
impl Bootstrap {
    /// Begin preparing the snapshot at `path` unless it already exists.
    ///
    /// Returns immediately; the download runs on a spawned task. At most one
    /// job ever runs per path in this process: a later call for the same
    /// path gets the existing job's state (pending, ready or failed) and
    /// never downloads again. Without a `url` there is nowhere to fetch a
    /// snapshot from, so a missing snapshot is recorded as
    /// [`BootstrapState::Failed`] straight away.
    ///
    /// # Panics
    ///
    /// Panics if a download has to be started outside of a Tokio runtime.
    pub fn start(path: impl Into<PathBuf>, url: Option<&str>, downloader: DownloadHandle) -> Self {
        let snapshot = Snapshot::new(path);
        if snapshot.exists() {
            tracing::debug!(path = %snapshot.path().display(), "snapshot already present");
            return Self::with_state(snapshot, BootstrapState::Ready).0;
        }
        let Some(url) = url else {
            tracing::warn!(path = %snapshot.path().display(), "snapshot missing and no download URL configured");
            return Self::with_state(snapshot, BootstrapState::Failed).0;
        };

        let key = std::path::absolute(snapshot.path()).unwrap_or_else(|_| snapshot.path().to_path_buf());
        let mut jobs = JOBS.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = jobs.get(&key) {
            tracing::debug!(path = %key.display(), state = %existing.state(), "joining existing snapshot bootstrap");
            return existing.clone();
        }

        let (bootstrap, state) = Self::with_state(snapshot, BootstrapState::Pending);
        jobs.insert(key, bootstrap.clone());
        drop(jobs);
        let path = bootstrap.snapshot.path().to_path_buf();
        let url = url.to_string();
        tokio::spawn(async move {
            let next = match prepare(&path, &url, downloader.as_ref()).await {
                Ok(()) => BootstrapState::Ready,
                Err(err) => {
                    tracing::warn!(error = ?err, "snapshot bootstrap failed; continuing without cache");
                    BootstrapState::Failed
                },
            };
            state.send_replace(next);
        });
        bootstrap
    }

    fn with_state(snapshot: Snapshot, initial: BootstrapState) -> (Self, watch::Sender<BootstrapState>) {
        let (sender, state) = watch::channel(initial);
        (Self { snapshot, state }, sender)
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.borrow()
    }

    /// Whether the snapshot can be queried right now.
    ///
    /// Both the published state and the file itself are checked, so a
    /// snapshot deleted from under a running process reads as a miss.
    pub fn is_ready(&self) -> bool {
        self.state() == BootstrapState::Ready && self.snapshot.exists()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Wait until the bootstrap has either succeeded or failed.
    ///
    /// Never needed for resolution; this is for callers that want to know
    /// the outcome, such as a command that only bootstraps.
    pub async fn wait(&self) -> BootstrapState {
        let mut state = self.state.clone();
        match state.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            // The task went away without publishing anything (it panicked).
            Err(_) => BootstrapState::Failed,
        }
    }
}

/// Download, decompress and install a snapshot at `snapshot`.
///
/// Every temporary file is removed before this returns, whether it succeeds
/// or not. A snapshot file is only ever present afterwards on success.
#[instrument(skip_all, fields(path = %snapshot.display(), url = %url))]
pub async fn prepare(snapshot: &Path, url: &str, downloader: &dyn Downloader) -> Result<()> {
    let compressed = compressed_path(snapshot, url);
    let partial = sibling(snapshot, ".partial");
    if let Some(parent) = snapshot.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Download)?;
    }

    tracing::info!("downloading snapshot");
    let downloaded = downloader.download(url, &compressed).await.or_raise(|| ErrorKind::Download);
    if downloaded.is_err() {
        remove_if_exists(&compressed).await;
        remove_if_exists(&partial).await;
        remove_if_exists(snapshot).await;
        return downloaded;
    }

    tracing::info!("extracting snapshot");
    let extracted = extract(&compressed, &partial, snapshot).await;
    if extracted.is_err() {
        remove_if_exists(&partial).await;
        remove_if_exists(snapshot).await;
    }
    remove_if_exists(&compressed).await;
    extracted?;

    tracing::info!("snapshot ready");
    Ok(())
}

async fn extract(compressed: &Path, partial: &Path, snapshot: &Path) -> Result<()> {
    let (source, destination) = (compressed.to_path_buf(), partial.to_path_buf());
    let (format, bytes) = tokio::task::spawn_blocking(move || extract_file(&source, &destination))
        .await
        .or_raise(|| ErrorKind::Extraction)?
        .or_raise(|| ErrorKind::Extraction)?;
    tracing::debug!(format = format.as_str(), bytes, "decompressed snapshot");

    // Don't install something that can't be queried.
    let rows = Snapshot::new(partial).count().await.or_raise(|| ErrorKind::Extraction)?;
    tracing::debug!(rows, "verified snapshot");

    tokio::fs::rename(partial, snapshot).await.or_raise(|| ErrorKind::Extraction)?;
    Ok(())
}

/// Where the download goes: the snapshot path plus the URL's compression
/// extension, or `.bz2` when the URL doesn't have a recognisable one.
fn compressed_path(snapshot: &Path, url: &str) -> PathBuf {
    let url_path = url.split(['?', '#']).next().unwrap_or(url);
    let format = match Compression::from_path(url_path) {
        Compression::None => Compression::Bzip2,
        format => format,
    };
    sibling(snapshot, format.extension())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed"),
        Err(e) if e.kind() == IoErrorKind::NotFound => {},
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove file"),
    }
}
