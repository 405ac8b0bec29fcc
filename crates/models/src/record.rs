use crate::ApprovalStatus;
use std::path::PathBuf;

/// Alternate keys identifying one item to a cache or online source.
///
/// The checksum, item id, and path each identify the same logical record; a
/// source should match on *any* of them rather than requiring all.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    /// Hash of the item's content (never changes for a given file).
    pub checksum: String,
    /// Online item identifier, if already known.
    pub online_id: Option<u64>,
    /// File name of the item within its set.
    pub path: PathBuf,
}

/// Authoritative metadata for one item, as reported by a cache row or the
/// online source.
///
/// These three fields always travel (and get applied) together.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OnlineRecord {
    pub status: ApprovalStatus,
    pub set_id: Option<u64>,
    pub item_id: Option<u64>,
}

/// A single row of the lookup snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub checksum: String,
    pub filename: String,
    pub set_id: Option<u64>,
    pub item_id: Option<u64>,
    pub status: ApprovalStatus,
}
impl CacheRecord {
    /// The resolution triple carried by this row.
    pub fn record(&self) -> OnlineRecord {
        OnlineRecord {
            status: self.status,
            set_id: self.set_id,
            item_id: self.item_id,
        }
    }
}
