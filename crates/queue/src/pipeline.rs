//! Resolution of a single item: snapshot first, then the online source.

use crate::SharedSet;
use crate::bootstrap::Bootstrap;
use derive_more::Display;
use setsync_models::{LookupKey, OnlineRecord};
use setsync_online::LookupHandle;
use tracing::field::display;
use tracing::{Span, instrument};

/// How an item's resolution ended.
///
/// Only used for logging and tests: resolution never reports errors to the
/// caller, its effects are the item's (and set's) updated fields.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Resolved from the local snapshot.
    #[display("cached")]
    Cached,
    /// Resolved by an online lookup.
    #[display("online")]
    Online,
    /// The online lookup failed; the item's online id was cleared.
    #[display("failed")]
    Failed,
    /// Nothing was attempted (offline, or the item no longer exists).
    #[display("skipped")]
    Skipped,
}

/// Resolves items against the snapshot and, failing that, the online source.
///
/// The first source that answers wins; a snapshot hit is never second-guessed
/// by an online lookup.
#[derive(Clone)]
pub struct Resolver {
    bootstrap: Bootstrap,
    online: LookupHandle,
}
impl Resolver {
    pub fn new(bootstrap: Bootstrap, online: LookupHandle) -> Self {
        Self { bootstrap, online }
    }

    /// Resolve the item at `index` in `set`, updating it in place.
    #[instrument(skip_all, fields(index, checksum, outcome))]
    pub async fn resolve(&self, set: &SharedSet, index: usize) -> Outcome {
        let outcome = self.resolve_inner(set, index).await;
        Span::current().record("outcome", display(outcome));
        tracing::debug!("resolved item");
        outcome
    }

    async fn resolve_inner(&self, set: &SharedSet, index: usize) -> Outcome {
        let key = match set.with(|set| set.lookup_key(index)) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(error = ?err, "item disappeared before it could be resolved");
                return Outcome::Skipped;
            },
        };
        Span::current().record("checksum", key.checksum.as_str());

        if let Some(record) = self.cached(&key).await {
            return Self::apply(set, index, &record, Outcome::Cached);
        }
        if !self.online.is_online() {
            return Outcome::Skipped;
        }
        match self.online.lookup(&key).await {
            Ok(record) => Self::apply(set, index, &record, Outcome::Online),
            Err(err) => {
                tracing::warn!(error = ?err, "online lookup failed; marking item unresolved");
                // Can only fail if the item vanished, in which case there's nothing to clear.
                _ = set.with(|set| set.mark_unresolved(index));
                Outcome::Failed
            },
        }
    }

    /// Look the key up in the snapshot, treating any problem as a miss.
    async fn cached(&self, key: &LookupKey) -> Option<OnlineRecord> {
        if !self.bootstrap.is_ready() {
            return None;
        }
        match self.bootstrap.snapshot().find(key).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = ?err, "snapshot query failed; falling back to online lookup");
                None
            },
        }
    }

    fn apply(set: &SharedSet, index: usize, record: &OnlineRecord, outcome: Outcome) -> Outcome {
        match set.with(|set| set.apply(index, record)) {
            Ok(()) => {
                tracing::trace!(status = %record.status, set_id = ?record.set_id, item_id = ?record.item_id, "applied record");
                outcome
            },
            Err(err) => {
                tracing::warn!(error = ?err, "item disappeared before it could be updated");
                Outcome::Skipped
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsync_models::{ApprovalStatus, CacheRecord, ContentItem, ContentSet};
    use setsync_online::download::MockDownloader;
    use setsync_online::lookup::MockLookup;
    use setsync_snapshot::Snapshot;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const RANKED: OnlineRecord = OnlineRecord {
        status: ApprovalStatus::Ranked,
        set_id: Some(100),
        item_id: Some(1000),
    };
    const LOVED: OnlineRecord = OnlineRecord {
        status: ApprovalStatus::Loved,
        set_id: Some(200),
        item_id: Some(2000),
    };

    async fn ready_bootstrap(dir: &Path, records: &[CacheRecord]) -> Bootstrap {
        let path = dir.join("online.db");
        Snapshot::create(&path, records).await.unwrap();
        Bootstrap::start(path, None, Arc::new(MockDownloader::failing()))
    }

    fn absent_bootstrap(dir: &Path) -> Bootstrap {
        Bootstrap::start(dir.join("online.db"), None, Arc::new(MockDownloader::failing()))
    }

    fn row(checksum: &str, filename: &str, record: OnlineRecord) -> CacheRecord {
        CacheRecord {
            checksum: checksum.to_string(),
            filename: filename.to_string(),
            set_id: record.set_id,
            item_id: record.item_id,
            status: record.status,
        }
    }

    fn single(item: ContentItem) -> SharedSet {
        SharedSet::new(ContentSet::new([item]))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_online() {
        let dir = TempDir::new().unwrap();
        let bootstrap = ready_bootstrap(dir.path(), &[row("a1", "a.chart", RANKED)]).await;
        let online = Arc::new(MockLookup::default().with_record("a1", LOVED));
        let resolver = Resolver::new(bootstrap, online.clone());
        let set = single(ContentItem::new("a1", "a.chart"));

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Cached);

        let set = set.snapshot();
        assert_eq!(set.items[0].status, ApprovalStatus::Ranked);
        assert_eq!(set.items[0].online_id, Some(1000));
        assert_eq!((set.status, set.online_id), (ApprovalStatus::Ranked, Some(100)));
        assert_eq!(online.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_matches_by_filename() {
        let dir = TempDir::new().unwrap();
        let bootstrap = ready_bootstrap(dir.path(), &[row("stale", "a.chart", RANKED)]).await;
        let online = Arc::new(MockLookup::default());
        let resolver = Resolver::new(bootstrap, online.clone());
        let set = single(ContentItem::new("edited", "a.chart"));

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Cached);
        assert_eq!(online.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_miss_goes_online() {
        let dir = TempDir::new().unwrap();
        let bootstrap = ready_bootstrap(dir.path(), &[row("a1", "a.chart", RANKED)]).await;
        let online = Arc::new(MockLookup::default().with_record("b2", LOVED));
        let resolver = Resolver::new(bootstrap, online.clone());
        let set = single(ContentItem::new("b2", "b.chart"));

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Online);
        assert_eq!(set.snapshot().items[0].status, ApprovalStatus::Loved);
        assert_eq!(online.calls_for("b2"), 1);
    }

    #[tokio::test]
    async fn test_no_snapshot_goes_online() {
        let dir = TempDir::new().unwrap();
        let online = Arc::new(MockLookup::default().with_record("b2", LOVED));
        let resolver = Resolver::new(absent_bootstrap(dir.path()), online.clone());
        let set = single(ContentItem::new("b2", "b.chart"));

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Online);
        assert_eq!(online.call_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("online.db");
        std::fs::write(&path, b"not a database").unwrap();
        let bootstrap = Bootstrap::start(&path, None, Arc::new(MockDownloader::failing()));
        let online = Arc::new(MockLookup::default().with_record("b2", LOVED));
        let resolver = Resolver::new(bootstrap, online.clone());
        let set = single(ContentItem::new("b2", "b.chart"));

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Online);
        assert_eq!(online.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_clears_online_id_only() {
        let dir = TempDir::new().unwrap();
        let online = Arc::new(MockLookup::default().with_failure("c3"));
        let resolver = Resolver::new(absent_bootstrap(dir.path()), online.clone());
        let mut item = ContentItem::new("c3", "c.chart").with_online_id(3000);
        item.status = ApprovalStatus::Pending;
        let set = single(item);

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Failed);

        let set = set.snapshot();
        assert_eq!(set.items[0].online_id, None);
        assert_eq!(set.items[0].status, ApprovalStatus::Pending);
        assert_eq!(set.online_id, None);
    }

    #[tokio::test]
    async fn test_offline_is_untouched() {
        let dir = TempDir::new().unwrap();
        let online = Arc::new(MockLookup::default().with_failure("c3").offline());
        let resolver = Resolver::new(absent_bootstrap(dir.path()), online.clone());
        let set = single(ContentItem::new("c3", "c.chart").with_online_id(3000));
        let before = set.snapshot();

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Skipped);
        assert_eq!(set.snapshot(), before);
        assert_eq!(online.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_index_is_skipped() {
        let dir = TempDir::new().unwrap();
        let online = Arc::new(MockLookup::default());
        let resolver = Resolver::new(absent_bootstrap(dir.path()), online.clone());
        let set = single(ContentItem::new("a1", "a.chart"));

        assert_eq!(resolver.resolve(&set, 5).await, Outcome::Skipped);
        assert_eq!(online.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rerun_refreshes() {
        let dir = TempDir::new().unwrap();
        let online = Arc::new(MockLookup::default().with_record("b2", LOVED));
        let resolver = Resolver::new(absent_bootstrap(dir.path()), online.clone());
        let set = single(ContentItem::new("b2", "b.chart"));

        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Online);
        let first = set.snapshot();
        assert_eq!(resolver.resolve(&set, 0).await, Outcome::Online);
        assert_eq!(set.snapshot(), first);
        assert_eq!(online.calls_for("b2"), 2);
    }
}
