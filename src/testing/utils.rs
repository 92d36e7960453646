//! In-memory collaborators for exercising the dispatcher.

use crate::catalog::{ConsumerCatalog, InstanceCatalog, ResyncTransport};
use crate::config::DispatcherConfig;
use crate::error::{CatalogError, Error, Result};
use crate::types::{ConsumerId, ConsumerRecord, InstanceRecord};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

/// Instance catalog with switchable failure injection and a call counter.
#[derive(Debug, Default)]
pub struct TestInstanceCatalog {
    instances: RwLock<Vec<InstanceRecord>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl TestInstanceCatalog {
    /// Create a catalog listing the given replica ids.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            instances: RwLock::new(ids.into_iter().map(InstanceRecord::new).collect()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the listing.
    pub fn set<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.instances.write() = ids.into_iter().map(InstanceRecord::new).collect();
    }

    /// Make every listing fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of listings served (including failed ones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceCatalog for TestInstanceCatalog {
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("instance listing failing".into()).into());
        }
        Ok(self.instances.read().clone())
    }
}

/// Consumer catalog with switchable failure injection and a call counter.
#[derive(Debug, Default)]
pub struct TestConsumerCatalog {
    consumers: RwLock<Vec<ConsumerRecord>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl TestConsumerCatalog {
    /// Create a catalog listing the given consumer ids.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            consumers: RwLock::new(ids.into_iter().map(ConsumerRecord::new).collect()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the listing.
    pub fn set<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.consumers.write() = ids.into_iter().map(ConsumerRecord::new).collect();
    }

    /// Make every listing fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of listings served (including failed ones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsumerCatalog for TestConsumerCatalog {
    async fn list_consumers(&self) -> Result<Vec<ConsumerRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("consumer listing failing".into()).into());
        }
        Ok(self.consumers.read().clone())
    }
}

/// Transport that records every resync attempt and can fail on demand.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<ConsumerId>>,
    failures_remaining: AtomicU32,
}

impl RecordingTransport {
    /// Create a transport that succeeds on every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` resync attempts.
    pub fn fail_times(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Every consumer id attempted so far, in order.
    pub fn requests(&self) -> Vec<ConsumerId> {
        self.requests.lock().clone()
    }

    /// Number of attempts recorded for a consumer.
    pub fn count_for(&self, consumer_id: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|id| *id == consumer_id)
            .count()
    }

    /// Whether at least one attempt was recorded for a consumer.
    pub fn has_resynced(&self, consumer_id: &str) -> bool {
        self.count_for(consumer_id) > 0
    }
}

#[async_trait]
impl ResyncTransport for RecordingTransport {
    async fn resync(&self, consumer_ids: &[ConsumerId]) -> Result<()> {
        self.requests.lock().extend_from_slice(consumer_ids);

        let fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(Error::Transport("injected resync failure".into()));
        }
        Ok(())
    }
}

/// Poll `condition` every 10 ms until it holds or the timeout elapses.
pub async fn wait_until<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Dispatcher configuration tightened for fast tests.
pub fn test_config(instance_id: &str) -> DispatcherConfig {
    DispatcherConfig::new(instance_id)
        .with_reconcile_interval(Duration::from_millis(50))
        .with_resync_workers(2)
}
