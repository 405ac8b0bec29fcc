//! Item lookups against the online source.

mod http;
#[cfg(feature = "mock")]
mod mock;

pub use self::http::HttpLookup;
#[cfg(feature = "mock")]
pub use self::mock::MockLookup;
use crate::error::Result;
use async_trait::async_trait;
use setsync_models::{LookupKey, OnlineRecord};

/// The authoritative source of item status and identifiers.
///
/// # Examples
///
/// ```
/// use setsync_models::{ContentItem, OnlineRecord};
/// use setsync_online::{OnlineLookup, error::Result};
///
/// async fn resolve_one(source: &dyn OnlineLookup, item: &ContentItem) -> Result<Option<OnlineRecord>> {
///     if !source.is_online() {
///         return Ok(None);
///     }
///     source.lookup(&item.lookup_key()).await.map(Some)
/// }
/// ```
#[async_trait]
pub trait OnlineLookup: Send + Sync {
    /// Whether lookups are currently worth attempting.
    ///
    /// This is a cheap, local check (no request is made); callers use it to
    /// skip work entirely rather than to guarantee that a lookup succeeds.
    fn is_online(&self) -> bool;

    /// Resolve a single item.
    ///
    /// Implementations should match on any field of the key, the same way
    /// the snapshot does. Exactly one request is made per call.
    async fn lookup(&self, key: &LookupKey) -> Result<OnlineRecord>;
}
