//! Online collaborators: item lookups and snapshot downloads.
//!
//! Both are traits so the queue never cares how they're implemented:
//!
//! - [`OnlineLookup`] resolves one item against the authoritative source and
//!   reports whether that source is currently reachable at all.
//! - [`Downloader`] fetches a file from a URL to a local path, succeeding or
//!   failing as a whole.
//!
//! HTTP implementations ([`HttpLookup`], [`HttpDownloader`]) are always
//! available. In-memory implementations for tests live behind the `mock`
//! feature.

pub mod download;
pub mod error;
pub mod lookup;

pub use crate::download::{Downloader, HttpDownloader};
pub use crate::lookup::{HttpLookup, OnlineLookup};
use std::sync::Arc;

pub type LookupHandle = Arc<dyn OnlineLookup>;
pub type DownloadHandle = Arc<dyn Downloader>;
