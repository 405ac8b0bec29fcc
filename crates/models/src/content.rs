use crate::error::{ErrorKind, Result};
use crate::{ApprovalStatus, LookupKey, OnlineRecord};
use exn::OptionExt;
use std::path::PathBuf;

/// One resolvable unit (e.g. a single difficulty) within a [`ContentSet`].
///
/// Items are always reached through their owning set, so there is no
/// back-reference stored here: the set and the item's index within it are
/// what identify an item.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentItem {
    /// Content hash; stable for the lifetime of the item.
    pub checksum: String,
    /// File name within the set.
    pub path: PathBuf,
    #[cfg_attr(feature = "serde", serde(default))]
    pub online_id: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: ApprovalStatus,
}
impl ContentItem {
    pub fn new(checksum: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            checksum: checksum.into(),
            path: path.into(),
            online_id: None,
            status: ApprovalStatus::default(),
        }
    }

    pub fn with_online_id(mut self, online_id: u64) -> Self {
        self.online_id = Some(online_id);
        self
    }

    pub fn lookup_key(&self) -> LookupKey {
        LookupKey {
            checksum: self.checksum.clone(),
            online_id: self.online_id,
            path: self.path.clone(),
        }
    }
}

/// A group of items sharing one online set identifier and approval status.
///
/// Sets are created and owned by the caller; reconciliation only ever
/// mutates their fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentSet {
    #[cfg_attr(feature = "serde", serde(default))]
    pub online_id: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: ApprovalStatus,
    pub items: Vec<ContentItem>,
}
impl ContentSet {
    pub fn new(items: impl IntoIterator<Item = ContentItem>) -> Self {
        Self {
            online_id: None,
            status: ApprovalStatus::default(),
            items: items.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Result<&ContentItem> {
        self.items.get(index).ok_or_raise(|| ErrorKind::NoSuchItem(index))
    }

    pub fn lookup_key(&self, index: usize) -> Result<LookupKey> {
        Ok(self.item(index)?.lookup_key())
    }

    /// Copy a resolved triple onto the item at `index` and onto the set.
    ///
    /// Status, set id and item id are written together; holding `&mut self`
    /// for the whole call is what makes the update all-or-nothing to anyone
    /// synchronising on the set.
    pub fn apply(&mut self, index: usize, record: &OnlineRecord) -> Result<()> {
        let item = self.items.get_mut(index).ok_or_raise(|| ErrorKind::NoSuchItem(index))?;
        item.status = record.status;
        item.online_id = record.item_id;
        self.status = record.status;
        self.online_id = record.set_id;
        Ok(())
    }

    /// Clear the online id of the item at `index`, leaving everything else.
    pub fn mark_unresolved(&mut self, index: usize) -> Result<()> {
        let item = self.items.get_mut(index).ok_or_raise(|| ErrorKind::NoSuchItem(index))?;
        item.online_id = None;
        Ok(())
    }
}
