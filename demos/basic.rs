//! Single-replica walkthrough: one dispatcher owning the whole consumer
//! population, with resync requests logged as they drain.
//!
//! Run with: cargo run --example basic

use drover::{
    ConsumerId, Dispatcher, DispatcherConfig, HashDispatcher, ResyncTransport,
    StaticConsumerCatalog, StaticInstanceCatalog,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct LoggingTransport;

#[async_trait::async_trait]
impl ResyncTransport for LoggingTransport {
    async fn resync(&self, consumer_ids: &[ConsumerId]) -> drover::Result<()> {
        println!("resync requested for {consumer_ids:?}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let instances = Arc::new(StaticInstanceCatalog::new(["replica-a"]));
    let consumers = Arc::new(StaticConsumerCatalog::new([
        "consumer-1",
        "consumer-2",
        "consumer-3",
    ]));

    let dispatcher = Arc::new(HashDispatcher::new(
        DispatcherConfig::new("replica-a").with_reconcile_interval(Duration::from_secs(1)),
        instances,
        consumers,
        Arc::new(LoggingTransport),
    )?);

    let shutdown = CancellationToken::new();
    let runner = dispatcher.clone();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move { runner.start(token).await });

    dispatcher.on_instance_up("replica-a".to_string()).await?;

    for consumer in ["consumer-1", "consumer-2", "consumer-99"] {
        println!(
            "dispatch({consumer}) = {}",
            dispatcher.dispatch(consumer)
        );
    }
    println!("stats: {:?}", dispatcher.stats());

    // Let the workers drain the resync queue before shutting down.
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown.cancel();
    handle.await?;
    println!("metrics: {:?}", dispatcher.metrics().snapshot());

    Ok(())
}
