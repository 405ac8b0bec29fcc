use super::OnlineLookup;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use setsync_models::{ApprovalStatus, LookupKey, OnlineRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::instrument;

/// Body of a successful `GET /lookup` response.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    id: Option<u64>,
    set_id: Option<u64>,
    status: ApprovalStatus,
}
impl From<LookupResponse> for OnlineRecord {
    fn from(response: LookupResponse) -> Self {
        Self {
            status: response.status,
            set_id: response.set_id,
            item_id: response.id,
        }
    }
}

/// HTTP client for the online lookup endpoint.
///
/// Issues `GET {base_url}/lookup?checksum=..&filename=..&id=..` (the `id`
/// parameter is omitted when unknown) and expects a JSON body of
/// `{"id": .., "set_id": .., "status": ".."}`.
///
/// Whether the source is online is tracked by an atomic flag owned by
/// whoever manages connectivity; the client never flips it by itself.
///
/// # Examples
///
/// ```no_run
/// use setsync_online::{HttpLookup, OnlineLookup};
/// use std::time::Duration;
///
/// # fn example() -> setsync_online::error::Result<()> {
/// let lookup = HttpLookup::new("https://online.example.com/api/v1", Duration::from_secs(30))?;
/// assert!(lookup.is_online());
/// lookup.set_online(false);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpLookup {
    client: reqwest::Client,
    base_url: String,
    online: AtomicBool,
}
impl HttpLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            online: AtomicBool::new(true),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    fn query(key: &LookupKey) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("checksum", key.checksum.clone()),
            ("filename", key.path.to_string_lossy().into_owned()),
        ];
        if let Some(id) = key.online_id {
            query.push(("id", id.to_string()));
        }
        query
    }
}

#[async_trait]
impl OnlineLookup for HttpLookup {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    #[instrument(skip_all, fields(checksum = %key.checksum, status))]
    async fn lookup(&self, key: &LookupKey) -> Result<OnlineRecord> {
        if !self.is_online() {
            exn::bail!(ErrorKind::Offline);
        }
        let response = self
            .client
            .get(format!("{}/lookup", self.base_url))
            .query(&Self::query(key))
            .send()
            .await
            .or_raise(|| ErrorKind::Network)?;
        let status = response.status();
        tracing::Span::current().record("status", status.as_u16());
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let body: LookupResponse = response.json().await.or_raise(|| ErrorKind::InvalidResponse)?;
        Ok(body.into())
    }
}
