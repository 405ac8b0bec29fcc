#![allow(dead_code)]

use setsync_models::{ApprovalStatus, CacheRecord, ContentItem, ContentSet};
use setsync_queue::SharedSet;
use setsync_snapshot::Snapshot;
use std::path::{Path, PathBuf};

pub fn row(checksum: &str, filename: &str, set_id: u64, item_id: u64, status: ApprovalStatus) -> CacheRecord {
    CacheRecord {
        checksum: checksum.to_string(),
        filename: filename.to_string(),
        set_id: Some(set_id),
        item_id: Some(item_id),
        status,
    }
}

pub async fn write_snapshot(dir: &Path, records: &[CacheRecord]) -> PathBuf {
    let path = dir.join("online.db");
    Snapshot::create(&path, records).await.unwrap();
    path
}

/// A snapshot file as it would be served for download.
pub async fn snapshot_download(records: &[CacheRecord]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), records).await;
    setsync_compress::Compression::Bzip2.compress(&std::fs::read(path).unwrap()).unwrap()
}

pub fn set_of(checksums: &[&str]) -> SharedSet {
    SharedSet::new(ContentSet::new(
        checksums.iter().map(|checksum| ContentItem::new(*checksum, format!("{checksum}.chart"))),
    ))
}
