use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use setsync_models::{ApprovalStatus, CacheRecord, OnlineRecord};

/// Columns selected by `find.sql`.
#[derive(sqlx::FromRow)]
pub(crate) struct RecordRow {
    approved: i64,
    set_id: Option<i64>,
    item_id: Option<i64>,
}
impl TryFrom<RecordRow> for OnlineRecord {
    type Error = Error;
    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: ApprovalStatus::try_from(row.approved).or_raise(|| ErrorKind::InvalidData("approval status"))?,
            set_id: row.set_id.map(u64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("set id"))?,
            item_id: row.item_id.map(u64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("item id"))?,
        })
    }
}

/// Bind parameters for `insert.sql`.
pub(crate) struct InsertRow<'a> {
    pub checksum: &'a str,
    pub filename: &'a str,
    pub item_id: Option<i64>,
    pub set_id: Option<i64>,
    pub approved: i64,
}
impl<'a> TryFrom<&'a CacheRecord> for InsertRow<'a> {
    type Error = Error;
    fn try_from(record: &'a CacheRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            checksum: &record.checksum,
            filename: &record.filename,
            item_id: record.item_id.map(i64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("item id"))?,
            set_id: record.set_id.map(i64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("set id"))?,
            approved: record.status.code(),
        })
    }
}
