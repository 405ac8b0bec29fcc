use crate::SharedSet;
use crate::bootstrap::Bootstrap;
use crate::pipeline::{Outcome, Resolver};
use crate::pool::ResolutionPool;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use setsync_online::{DownloadHandle, LookupHandle};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Final location of the local snapshot.
    pub snapshot_path: PathBuf,
    /// Where to fetch a compressed snapshot from if there isn't one locally.
    pub snapshot_url: Option<String>,
    /// Pool size when the queue creates its own pool.
    pub concurrency: usize,
}
impl QueueOptions {
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            snapshot_url: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.snapshot_url = Some(url.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// How an update finished.
///
/// Carries no success or failure detail: individual failures only show up in
/// the log and as items left without an online id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every item was attempted.
    Finished,
    /// The token was cancelled; some items may not have been attempted.
    Cancelled,
}

/// Resolves whole content sets, one pool task per item.
///
/// Cloning is cheap; clones share the pool and the bootstrap.
#[derive(Clone)]
pub struct UpdateQueue {
    pool: ResolutionPool,
    bootstrap: Bootstrap,
    resolver: Resolver,
    online: LookupHandle,
}
impl UpdateQueue {
    /// Create a queue with its own pool of `options.concurrency` workers.
    ///
    /// Starts fetching the snapshot in the background if it's missing.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(options: QueueOptions, online: LookupHandle, downloader: DownloadHandle) -> Self {
        let pool = ResolutionPool::new(options.concurrency);
        Self::with_pool(options, pool, online, downloader)
    }

    /// Create a queue that submits to an existing pool.
    ///
    /// `options.concurrency` is ignored; the pool's size applies.
    pub fn with_pool(
        options: QueueOptions,
        pool: ResolutionPool,
        online: LookupHandle,
        downloader: DownloadHandle,
    ) -> Self {
        let bootstrap = Bootstrap::start(options.snapshot_path, options.snapshot_url.as_deref(), downloader);
        let resolver = Resolver::new(bootstrap.clone(), online.clone());
        Self {
            pool,
            bootstrap,
            resolver,
            online,
        }
    }

    pub fn bootstrap(&self) -> &Bootstrap {
        &self.bootstrap
    }

    pub fn pool(&self) -> &ResolutionPool {
        &self.pool
    }

    /// Resolve every item of `set` in the background.
    ///
    /// When the online source is offline nothing is scheduled and the
    /// returned handle is already complete. Otherwise each item becomes one
    /// pool task, and the handle completes once every task has either run or
    /// been skipped because `token` was cancelled first.
    ///
    /// Dropping the handle doesn't stop the update.
    #[instrument(skip_all, fields(items))]
    pub fn update(&self, set: SharedSet, token: CancellationToken) -> UpdateHandle {
        if !self.online.is_online() {
            tracing::debug!("online source offline; nothing to update");
            return UpdateHandle::ready(Completion::Finished);
        }

        let items = set.len();
        tracing::Span::current().record("items", items);
        let tasks: Vec<_> = (0..items)
            .map(|index| {
                let (resolver, set) = (self.resolver.clone(), set.clone());
                self.pool.submit(&token, async move { resolver.resolve(&set, index).await })
            })
            .collect();

        let span = tracing::Span::current();
        UpdateHandle {
            inner: async move {
                let outcomes = join_all(tasks).await;
                let count = |wanted: Outcome| outcomes.iter().filter(|outcome| **outcome == Some(wanted)).count();
                tracing::info!(
                    parent: &span,
                    cached = count(Outcome::Cached),
                    online = count(Outcome::Online),
                    failed = count(Outcome::Failed),
                    skipped = count(Outcome::Skipped),
                    not_run = outcomes.iter().filter(|outcome| outcome.is_none()).count(),
                    "set update complete"
                );
                if token.is_cancelled() {
                    Completion::Cancelled
                } else {
                    Completion::Finished
                }
            }
            .boxed(),
        }
    }
}

/// Completion of an [`UpdateQueue::update`] call.
#[must_use = "dropping the handle does not cancel the update"]
pub struct UpdateHandle {
    inner: BoxFuture<'static, Completion>,
}
impl UpdateHandle {
    fn ready(completion: Completion) -> Self {
        Self {
            inner: futures::future::ready(completion).boxed(),
        }
    }
}
impl Future for UpdateHandle {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}
impl fmt::Debug for UpdateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHandle").finish_non_exhaustive()
    }
}
