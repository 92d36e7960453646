//! Consumer-to-replica assignment for horizontally scaled fleets.
//!
//! A fleet of replicas shares responsibility for a large population of
//! external consumers, each emitting status events. This crate answers one
//! question on every replica (*does this replica own consumer C right
//! now?*) such that exactly one replica answers yes for any consumer,
//! with no coordination beyond a shared view of membership:
//!
//! - A **bounded-load consistent-hash ring** maps consumers to replicas
//!   deterministically, so every replica computes the same assignment.
//! - A **reconcile loop** (every 5 s and after membership signals) diffs
//!   the live instance and consumer listings against local state.
//! - A **rate-limited resync queue** with a worker pool asks the event
//!   transport to re-emit status for every consumer this replica acquires,
//!   recovering events missed during the handover.
//!
//! # Example
//!
//! ```rust,no_run
//! use drover::{
//!     Dispatcher, DispatcherConfig, HashDispatcher, NoopResyncTransport,
//!     StaticConsumerCatalog, StaticInstanceCatalog,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let instances = Arc::new(StaticInstanceCatalog::new(["replica-a"]));
//!     let consumers = Arc::new(StaticConsumerCatalog::new(["consumer-1", "consumer-2"]));
//!
//!     let dispatcher = Arc::new(HashDispatcher::new(
//!         DispatcherConfig::new("replica-a"),
//!         instances,
//!         consumers,
//!         Arc::new(NoopResyncTransport),
//!     )?);
//!
//!     let shutdown = CancellationToken::new();
//!     let runner = dispatcher.clone();
//!     let token = shutdown.clone();
//!     tokio::spawn(async move { runner.start(token).await });
//!
//!     dispatcher.on_instance_up("replica-a".to_string()).await?;
//!
//!     if dispatcher.dispatch("consumer-1") {
//!         // process the event on this replica
//!     }
//!
//!     shutdown.cancel();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Event transport                 │
//! │   dispatch(consumer)? ──── resync(ids) ◀──┐ │
//! └───────────┬────────────────────────────────┼─┘
//!             ▼                                │
//! ┌─────────────────────────────────────────────┐
//! │              HashDispatcher                  │
//! │  on_instance_up/down     start(cancel)       │
//! └─────┬──────────┬─────────────┬──────────────┘
//!       ▼          ▼             ▼
//! ┌─────────┐ ┌──────────┐ ┌───────────┐
//! │ HashRing│ │ConsumerSet│ │ResyncQueue│──▶ workers
//! └─────────┘ └──────────┘ └───────────┘
//! ```
//!
//! # Consistency model
//!
//! Assignment is eventually consistent. Replicas converge on ownership
//! within one reconcile tick of agreeing on membership; during a handover
//! a consumer's events may be dropped by the releasing replica before the
//! acquiring replica has reconciled. The resync issued on acquisition
//! closes that gap, so the event transport must deliver at least once and
//! resync must be idempotent.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod partitioning;
pub mod queue;
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use catalog::{
    ConsumerCatalog, InstanceCatalog, NoopResyncTransport, ResyncTransport, StaticConsumerCatalog,
    StaticInstanceCatalog,
};
pub use config::{DispatcherConfig, RingConfig};
pub use dispatcher::{Dispatcher, HashDispatcher};
pub use error::{CatalogError, Error, Result, RingError};
pub use metrics::{Counter, DispatcherMetrics, Gauge, MetricsSnapshot};
pub use partitioning::{ConsumerSet, HashRing};
pub use queue::ResyncQueue;
pub use types::{ConsumerId, ConsumerRecord, DispatcherStats, InstanceRecord, ReplicaId};
