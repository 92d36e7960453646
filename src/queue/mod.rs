//! Rate-limited resync work queue.
//!
//! The queue de-duplicates pending consumer ids, defers re-adds of items
//! that are still being processed, and holds failed items back with
//! per-item exponential delay before they become ready again. Producers
//! never block; consumers await [`ResyncQueue::get`], which returns `None`
//! once the queue is shut down.

mod backoff;

pub use backoff::ItemBackoff;

use crate::types::ConsumerId;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};

/// Default initial back-off after a failed resync.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(5);

/// Default upper bound on the resync back-off.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1000);

/// An item held back until its back-off delay elapses.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DelayedEntry {
    due: Instant,
    consumer_id: ConsumerId,
}

#[derive(Debug)]
struct QueueState {
    /// Items ready to be handed to a worker, in arrival order.
    ready: VecDeque<ConsumerId>,

    /// Items added but not yet picked up; the de-duplication set.
    dirty: HashSet<ConsumerId>,

    /// Items currently held by a worker.
    processing: HashSet<ConsumerId>,

    /// Items waiting out a back-off delay, ordered by due time.
    delayed: BinaryHeap<Reverse<DelayedEntry>>,

    /// Per-item failure counts driving the delays.
    backoff: ItemBackoff,

    shutting_down: bool,
}

impl QueueState {
    /// Mark an item dirty and, unless a worker still holds it, make it
    /// ready. Returns whether the ready queue gained an item.
    fn enqueue(&mut self, consumer_id: ConsumerId) -> bool {
        if self.dirty.contains(&consumer_id) {
            return false;
        }
        self.dirty.insert(consumer_id.clone());
        if self.processing.contains(&consumer_id) {
            return false;
        }
        self.ready.push_back(consumer_id);
        true
    }

    /// Move every delayed item whose due time has passed into the ready
    /// queue, applying the usual de-duplication.
    fn promote_due(&mut self, now: Instant) {
        while self
            .delayed
            .peek()
            .is_some_and(|Reverse(entry)| entry.due <= now)
        {
            if let Some(Reverse(entry)) = self.delayed.pop() {
                self.enqueue(entry.consumer_id);
            }
        }
    }

    /// Due time of the next delayed item, if any.
    fn next_due(&self) -> Option<Instant> {
        self.delayed.peek().map(|Reverse(entry)| entry.due)
    }
}

/// De-duplicating work queue of consumer ids awaiting resync.
#[derive(Debug)]
pub struct ResyncQueue {
    state: Mutex<QueueState>,
    wakeup: Notify,
}

impl ResyncQueue {
    /// Create a queue with the default back-off bounds.
    pub fn new() -> Self {
        Self::with_backoff(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    /// Create a queue with custom back-off bounds.
    pub fn with_backoff(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            state: Mutex::new(QueueState {
                ready: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                delayed: BinaryHeap::new(),
                backoff: ItemBackoff::new(base_delay, max_delay),
                shutting_down: false,
            }),
            wakeup: Notify::new(),
        }
    }

    /// Enqueue an item immediately.
    ///
    /// An item already pending is dropped; an item currently being
    /// processed is re-queued only once [`done`](Self::done) is called for
    /// it. No-op after shutdown.
    pub fn add(&self, consumer_id: ConsumerId) {
        let mut state = self.state.lock();
        if state.shutting_down {
            return;
        }
        if state.enqueue(consumer_id) {
            drop(state);
            self.wakeup.notify_one();
        }
    }

    /// Enqueue an item after its exponential back-off delay.
    ///
    /// Each call counts as one more failure for the item, doubling the
    /// delay up to the configured cap.
    pub fn add_rate_limited(&self, consumer_id: ConsumerId) {
        let mut state = self.state.lock();
        if state.shutting_down {
            return;
        }
        let delay = state.backoff.next_delay(&consumer_id);
        state.delayed.push(Reverse(DelayedEntry {
            due: Instant::now() + delay,
            consumer_id,
        }));
        drop(state);
        self.wakeup.notify_one();
    }

    /// Wait for the next ready item.
    ///
    /// Returns `None` once the queue has been shut down. An item handed out
    /// is considered processing until [`done`](Self::done) is called for it.
    pub async fn get(&self) -> Option<ConsumerId> {
        loop {
            let mut notified = std::pin::pin!(self.wakeup.notified());
            notified.as_mut().enable();

            let next_due = {
                let mut state = self.state.lock();
                state.promote_due(Instant::now());

                if state.shutting_down {
                    return None;
                }
                if let Some(consumer_id) = state.ready.pop_front() {
                    state.dirty.remove(&consumer_id);
                    state.processing.insert(consumer_id.clone());
                    return Some(consumer_id);
                }
                state.next_due()
            };

            match next_due {
                Some(due) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = sleep_until(due) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark an item's processing as finished.
    ///
    /// If the item was re-added while it was being processed, it becomes
    /// ready now.
    pub fn done(&self, consumer_id: &str) {
        let mut state = self.state.lock();
        state.processing.remove(consumer_id);
        if state.shutting_down {
            return;
        }
        if state.dirty.contains(consumer_id) {
            state.ready.push_back(consumer_id.to_string());
            drop(state);
            self.wakeup.notify_one();
        }
    }

    /// Clear the back-off state for an item.
    pub fn forget(&self, consumer_id: &str) {
        self.state.lock().backoff.forget(consumer_id);
    }

    /// Shut the queue down: every pending and future [`get`](Self::get)
    /// returns `None`. Queued items are not drained.
    pub fn shut_down(&self) {
        self.state.lock().shutting_down = true;
        self.wakeup.notify_waiters();
    }

    /// Whether the queue has been shut down.
    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    /// Number of items ready to be handed out.
    pub fn len(&self) -> usize {
        self.state.lock().ready.len()
    }

    /// Whether no items are ready.
    pub fn is_empty(&self) -> bool {
        self.state.lock().ready.is_empty()
    }

    /// Number of items waiting out a back-off delay.
    pub fn delayed_len(&self) -> usize {
        self.state.lock().delayed.len()
    }

    /// Consecutive failures recorded for an item.
    pub fn failure_count(&self, consumer_id: &str) -> u32 {
        self.state.lock().backoff.failures(consumer_id)
    }
}

impl Default for ResyncQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_get_done() {
        let queue = ResyncQueue::new();
        queue.add("consumer-1".to_string());

        let id = queue.get().await.unwrap();
        assert_eq!(id, "consumer-1");
        assert_eq!(queue.len(), 0);

        queue.done(&id);
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_add_deduplicates_pending() {
        let queue = ResyncQueue::new();
        queue.add("consumer-1".to_string());
        queue.add("consumer-1".to_string());
        queue.add("consumer-2".to_string());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get().await.as_deref(), Some("consumer-1"));
        assert_eq!(queue.get().await.as_deref(), Some("consumer-2"));
        assert_eq!(queue.len(), 0);
    }

    #[tokio::test]
    async fn test_re_add_while_processing_is_deferred() {
        let queue = ResyncQueue::new();
        queue.add("consumer-1".to_string());
        let id = queue.get().await.unwrap();

        queue.add("consumer-1".to_string());
        assert_eq!(queue.len(), 0);

        queue.done(&id);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await.as_deref(), Some("consumer-1"));
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_get() {
        let queue = Arc::new(ResyncQueue::new());

        let getter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.get().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.shut_down();
        assert_eq!(getter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shutdown_stops_handing_out_items() {
        let queue = ResyncQueue::new();
        queue.add("consumer-1".to_string());
        queue.shut_down();

        assert_eq!(queue.get().await, None);

        queue.add("consumer-2".to_string());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_items_wait_for_backoff() {
        let queue = ResyncQueue::new();
        let start = Instant::now();

        queue.add_rate_limited("consumer-1".to_string());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.delayed_len(), 1);

        let id = queue.get().await;
        assert_eq!(id.as_deref(), Some("consumer-1"));
        assert!(start.elapsed() >= Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_across_failures() {
        let queue = ResyncQueue::new();
        queue.add_rate_limited("consumer-1".to_string());
        let id = queue.get().await.unwrap();
        queue.done(&id);

        let start = Instant::now();
        queue.add_rate_limited("consumer-1".to_string());
        queue.get().await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(queue.failure_count("consumer-1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_resets_backoff() {
        let queue = ResyncQueue::new();
        queue.add_rate_limited("consumer-1".to_string());
        let id = queue.get().await.unwrap();
        queue.done(&id);

        queue.forget("consumer-1");
        assert_eq!(queue.failure_count("consumer-1"), 0);
    }
}
