//! In-memory lookup source for testing.

use super::OnlineLookup;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use setsync_models::{LookupKey, OnlineRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};

/// Scripted [`OnlineLookup`] that records every call it receives.
///
/// Responses are keyed by checksum. Checksums without a scripted response
/// fail with a `404` status, the same as an unknown item would online.
///
/// Lookups can be slowed down ([`with_delay`](Self::with_delay)) or held
/// until the test lets them through ([`gated`](Self::gated) and
/// [`release`](Self::release)), which makes concurrency observable:
/// [`peak_in_flight`](Self::peak_in_flight) reports the most lookups that
/// were ever running at the same time.
///
/// # Examples
///
/// ```
/// use setsync_models::{ApprovalStatus, ContentItem, OnlineRecord};
/// use setsync_online::OnlineLookup;
/// use setsync_online::lookup::MockLookup;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ranked = OnlineRecord { status: ApprovalStatus::Ranked, set_id: Some(1), item_id: Some(2) };
/// let lookup = MockLookup::default().with_record("abc", ranked).with_failure("def");
///
/// let item = ContentItem::new("abc", "easy.chart");
/// assert_eq!(lookup.lookup(&item.lookup_key()).await.unwrap(), ranked);
/// assert!(lookup.lookup(&ContentItem::new("def", "hard.chart").lookup_key()).await.is_err());
/// assert_eq!(lookup.call_count(), 2);
/// # }
/// ```
pub struct MockLookup {
    online: AtomicBool,
    responses: HashMap<String, Option<OnlineRecord>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    calls: watch::Sender<Vec<LookupKey>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockLookup {
    /// Respond to lookups for `checksum` with `record`.
    pub fn with_record(mut self, checksum: impl Into<String>, record: OnlineRecord) -> Self {
        self.responses.insert(checksum.into(), Some(record));
        self
    }

    /// Fail lookups for `checksum` with a server error.
    pub fn with_failure(mut self, checksum: impl Into<String>) -> Self {
        self.responses.insert(checksum.into(), None);
        self
    }

    /// Sleep for `delay` inside every lookup before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Hold every lookup until a permit is handed out with [`release`](Self::release).
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Start in the offline state.
    pub fn offline(self) -> Self {
        self.set_online(false);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }

    /// Let `count` held lookups (current or future) complete.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Every key looked up so far, in call order.
    pub fn calls(&self) -> Vec<LookupKey> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Number of lookups made for a single checksum.
    pub fn calls_for(&self, checksum: &str) -> usize {
        self.calls.borrow().iter().filter(|key| key.checksum == checksum).count()
    }

    /// Wait until at least `count` lookups have started.
    pub async fn wait_for_calls(&self, count: usize) {
        let mut rx = self.calls.subscribe();
        // The sender lives in `self`, so the channel can't close while we wait.
        _ = rx.wait_for(|calls| calls.len() >= count).await;
    }

    /// Lookups currently in progress.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The highest number of lookups that were ever in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}
impl Default for MockLookup {
    fn default() -> Self {
        Self {
            online: AtomicBool::new(true),
            responses: HashMap::new(),
            delay: None,
            gate: None,
            calls: watch::Sender::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

/// Decrements the in-flight counter however the lookup future ends.
struct InFlight<'a>(&'a AtomicUsize);
impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[async_trait]
impl OnlineLookup for MockLookup {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    async fn lookup(&self, key: &LookupKey) -> Result<OnlineRecord> {
        if !self.is_online() {
            exn::bail!(ErrorKind::Offline);
        }
        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak.fetch_max(current, Ordering::AcqRel);
        self.calls.send_modify(|calls| calls.push(key.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        match self.responses.get(&key.checksum) {
            Some(Some(record)) => Ok(*record),
            Some(None) => exn::bail!(ErrorKind::Status(500)),
            None => exn::bail!(ErrorKind::Status(404)),
        }
    }
}
