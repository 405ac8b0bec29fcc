//! Models for content sets and their online metadata.
//!
//! A [`ContentSet`] groups [`ContentItem`]s that share one online set
//! identifier and one [`ApprovalStatus`]. Items are resolved against an
//! online source by their [`LookupKey`], producing an [`OnlineRecord`]: the
//! (status, set id, item id) triple that is always applied as a unit.

mod content;
pub mod error;
mod record;
mod status;

pub use crate::content::{ContentItem, ContentSet};
pub use crate::record::{CacheRecord, LookupKey, OnlineRecord};
pub use crate::status::ApprovalStatus;
