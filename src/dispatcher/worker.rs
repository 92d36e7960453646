//! Resync workers draining the rate-limited queue.

use crate::catalog::ResyncTransport;
use crate::metrics::DispatcherMetrics;
use crate::queue::ResyncQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Process queue items until the queue shuts down or the dispatcher is
/// cancelled. A failed resync is requeued with back-off; a successful one
/// clears the item's back-off state.
pub(crate) async fn run_resync_worker(
    worker_id: usize,
    queue: Arc<ResyncQueue>,
    transport: Arc<dyn ResyncTransport>,
    metrics: Arc<DispatcherMetrics>,
    shutdown: CancellationToken,
) {
    while let Some(consumer_id) = queue.get().await {
        // Malformed catalog records surface as empty ids; skip, don't retry.
        if consumer_id.is_empty() {
            queue.forget(&consumer_id);
            queue.done(&consumer_id);
            continue;
        }

        debug!(worker_id, consumer = %consumer_id, "processing status resync request");

        let outcome = tokio::select! {
            biased;

            _ = shutdown.cancelled() => None,
            result = transport.resync(std::slice::from_ref(&consumer_id)) => Some(result),
        };

        let Some(result) = outcome else {
            queue.done(&consumer_id);
            break;
        };

        match result {
            Ok(()) => {
                metrics.resync_success.inc();
                queue.forget(&consumer_id);
            }
            Err(error) => {
                warn!(
                    worker_id,
                    consumer = %consumer_id,
                    error = %error,
                    "status resync failed, requeueing with back-off"
                );
                metrics.resync_failures.inc();
                queue.add_rate_limited(consumer_id.clone());
            }
        }

        queue.done(&consumer_id);
    }

    debug!(worker_id, "resync worker exiting");
}
