use crate::error::{ErrorKind, Result};
use crate::row::{InsertRow, RecordRow};
use exn::{OptionExt, ResultExt};
use setsync_models::{CacheRecord, LookupKey, OnlineRecord};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

// Readers never write, so the only contention is a writer replacing the
// file; don't wait around for it.
const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Handle to a snapshot file on disk.
///
/// Holding a `Snapshot` doesn't hold the file open: every query opens its own
/// read-only connection and closes it again before returning. The file may
/// not exist yet (or any more); queries then fail with
/// [`ErrorKind::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a snapshot file currently exists at this location.
    ///
    /// This says nothing about whether the file is complete or valid.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Find the first record matching *any* of the lookup key's fields.
    ///
    /// Checksum, online id and file name are alternate keys into the same
    /// logical record, so a row matching on any one of them is returned.
    #[instrument(skip_all, fields(snapshot = %self.path.display(), checksum = %key.checksum))]
    pub async fn find(&self, key: &LookupKey) -> Result<Option<OnlineRecord>> {
        let filename = key.path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?;
        // An id too large for SQLite can't be in the table; it just won't match.
        let item_id = key.online_id.and_then(|id| i64::try_from(id).ok());
        let mut conn = self.connect().await?;
        let row: Result<Option<RecordRow>> = sqlx::query_as(include_str!("../queries/find.sql"))
            .bind(&key.checksum)
            .bind(item_id)
            .bind(filename)
            .fetch_optional(&mut conn)
            .await
            .or_raise(|| ErrorKind::Database);
        _ = conn.close().await;
        row?.map(OnlineRecord::try_from).transpose()
    }

    /// Count the records in the snapshot.
    pub async fn count(&self) -> Result<u64> {
        let mut conn = self.connect().await?;
        let count: std::result::Result<i64, _> =
            sqlx::query_scalar(include_str!("../queries/count.sql")).fetch_one(&mut conn).await;
        _ = conn.close().await;
        let count = count.or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("row count"))
    }

    /// Write a new snapshot file containing `records`.
    ///
    /// Snapshots are normally produced by the online source and downloaded,
    /// never written locally. This exists for tooling and for fixtures; do NOT
    /// apply `#[cfg(test)]` so that other crates can use it in their tests.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), rows))]
    pub async fn create<'a>(
        path: impl AsRef<Path>,
        records: impl IntoIterator<Item = &'a CacheRecord>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            exn::bail!(ErrorKind::AlreadyExists(path.to_path_buf()));
        }
        let rows = records.into_iter().map(InsertRow::try_from).collect::<Result<Vec<_>>>()?;
        let mut conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut tx = conn.begin().await.or_raise(|| ErrorKind::Database)?;
        sqlx::raw_sql(include_str!("../queries/schema.sql")).execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        for row in &rows {
            sqlx::query(include_str!("../queries/insert.sql"))
                .bind(row.checksum)
                .bind(row.filename)
                .bind(row.item_id)
                .bind(row.set_id)
                .bind(row.approved)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        conn.close().await.or_raise(|| ErrorKind::Database)?;
        tracing::Span::current().record("rows", rows.len());
        Ok(Self::new(path))
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        // Without this check SQLite reports a generic "unable to open" error.
        if !self.exists() {
            exn::bail!(ErrorKind::NotFound(self.path.clone()));
        }
        SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .busy_timeout(BUSY_TIMEOUT)
            .connect()
            .await
            .or_raise(|| ErrorKind::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsync_models::ApprovalStatus;
    use tempfile::TempDir;

    fn record(checksum: &str, filename: &str, set_id: u64, item_id: u64, status: ApprovalStatus) -> CacheRecord {
        CacheRecord {
            checksum: checksum.to_string(),
            filename: filename.to_string(),
            set_id: Some(set_id),
            item_id: Some(item_id),
            status,
        }
    }

    fn key(checksum: &str, online_id: Option<u64>, path: &str) -> LookupKey {
        LookupKey {
            checksum: checksum.to_string(),
            online_id,
            path: PathBuf::from(path),
        }
    }

    async fn fixture() -> (TempDir, Snapshot) {
        let dir = tempfile::tempdir().unwrap();
        let records = [
            record("aaaa", "set-one-easy.chart", 10, 100, ApprovalStatus::Ranked),
            record("bbbb", "set-one-hard.chart", 10, 101, ApprovalStatus::Ranked),
            record("cccc", "set-two-normal.chart", 20, 200, ApprovalStatus::Loved),
        ];
        let snapshot = Snapshot::create(dir.path().join("online.db"), &records).await.unwrap();
        (dir, snapshot)
    }

    #[tokio::test]
    async fn test_find_by_checksum() {
        let (_dir, snapshot) = fixture().await;
        let found = snapshot.find(&key("bbbb", None, "renamed.chart")).await.unwrap().unwrap();
        assert_eq!(found.status, ApprovalStatus::Ranked);
        assert_eq!(found.set_id, Some(10));
        assert_eq!(found.item_id, Some(101));
    }

    #[tokio::test]
    async fn test_find_by_online_id() {
        let (_dir, snapshot) = fixture().await;
        let found = snapshot.find(&key("changed-locally", Some(200), "renamed.chart")).await.unwrap().unwrap();
        assert_eq!(found.status, ApprovalStatus::Loved);
        assert_eq!(found.set_id, Some(20));
    }

    #[tokio::test]
    async fn test_find_by_filename() {
        let (_dir, snapshot) = fixture().await;
        let found = snapshot.find(&key("changed-locally", None, "set-one-easy.chart")).await.unwrap().unwrap();
        assert_eq!(found.item_id, Some(100));
    }

    #[tokio::test]
    async fn test_find_miss() {
        let (_dir, snapshot) = fixture().await;
        assert_eq!(snapshot.find(&key("zzzz", Some(999), "unknown.chart")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(dir.path().join("online.db"));
        assert!(!snapshot.exists());
        let err = snapshot.find(&key("aaaa", None, "a.chart")).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::NotFound(_)));
        // Looking must never create the file.
        assert!(!snapshot.exists());
    }

    #[tokio::test]
    async fn test_find_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("online.db");
        std::fs::write(&path, b"BZh9 half-extracted garbage rather than a database").unwrap();
        let snapshot = Snapshot::new(&path);
        let err = snapshot.find(&key("aaaa", None, "a.chart")).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Database));
    }

    #[tokio::test]
    async fn test_find_invalid_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("online.db");
        let snapshot = Snapshot::create(&path, std::iter::empty()).await.unwrap();
        let mut conn = SqliteConnectOptions::new().filename(&path).connect().await.unwrap();
        sqlx::query("INSERT INTO online_items (checksum, filename, item_id, set_id, approved) VALUES ('x', 'x', 1, 1, 99)")
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        let err = snapshot.find(&key("x", None, "x")).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidData("approval status")));
    }

    #[tokio::test]
    async fn test_count() {
        let (_dir, snapshot) = fixture().await;
        assert_eq!(snapshot.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_create_refuses_to_overwrite() {
        let (_dir, snapshot) = fixture().await;
        let err = Snapshot::create(snapshot.path(), std::iter::empty()).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::AlreadyExists(_)));
        assert_eq!(snapshot.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_readers() {
        let (_dir, snapshot) = fixture().await;
        let keys = ["aaaa", "bbbb", "cccc", "dddd"].map(|checksum| key(checksum, None, "nothing.chart"));
        let (a, b, c, d) = tokio::join!(
            snapshot.find(&keys[0]),
            snapshot.find(&keys[1]),
            snapshot.find(&keys[2]),
            snapshot.find(&keys[3]),
        );
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert!(c.unwrap().is_some());
        assert!(d.unwrap().is_none());
    }
}
