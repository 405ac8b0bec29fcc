//! Read-only SQLite snapshot of online lookup records.
//!
//! The snapshot is a single SQLite file containing one table of
//! [`CacheRecord`](setsync_models::CacheRecord)s, published by the online
//! source as a compressed download. It is never modified row-by-row: a new
//! snapshot replaces the old file wholesale.
//!
//! Lookups open a fresh read-only connection per query. There is no pool and
//! no shared connection state, so any number of concurrent readers can query
//! the same file, and a file that appears (or disappears) between two queries
//! is simply picked up (or reported missing) by the next one.

pub mod error;
mod row;
mod snapshot;

pub use crate::snapshot::Snapshot;
