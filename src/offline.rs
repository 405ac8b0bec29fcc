use async_trait::async_trait;
use setsync_models::{LookupKey, OnlineRecord};
use setsync_online::OnlineLookup;
use setsync_online::error::{ErrorKind, Result};

/// Stand-in lookup for when no online endpoint is configured.
///
/// Always reports offline, so updates finish immediately and only the
/// bootstrap does any work.
pub struct Offline;

#[async_trait]
impl OnlineLookup for Offline {
    fn is_online(&self) -> bool {
        false
    }

    async fn lookup(&self, _key: &LookupKey) -> Result<OnlineRecord> {
        exn::bail!(ErrorKind::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsync_models::ContentItem;

    #[tokio::test]
    async fn test_always_offline() {
        assert!(!Offline.is_online());
        let err = Offline.lookup(&ContentItem::new("a1", "a.chart").lookup_key()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Offline);
    }
}
