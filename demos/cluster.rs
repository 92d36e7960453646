//! Three replicas in one process sharing the same catalogs, showing how
//! ownership splits across the fleet and rebalances when a replica dies.
//!
//! Run with: cargo run --example cluster

use drover::{
    Dispatcher, DispatcherConfig, HashDispatcher, NoopResyncTransport, StaticConsumerCatalog,
    StaticInstanceCatalog,
};
use std::sync::Arc;

const REPLICAS: [&str; 3] = ["replica-a", "replica-b", "replica-c"];

fn ownership_report(replica: &str, dispatcher: &HashDispatcher, consumers: &[String]) -> String {
    let owned: Vec<&str> = consumers
        .iter()
        .filter(|c| dispatcher.dispatch(c))
        .map(|c| c.as_str())
        .collect();
    format!("{replica} owns {:2} consumers: {owned:?}", owned.len())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let consumer_ids: Vec<String> = (0..12).map(|i| format!("consumer-{i}")).collect();

    let instances = Arc::new(StaticInstanceCatalog::new(REPLICAS));
    let consumers = Arc::new(StaticConsumerCatalog::new(consumer_ids.iter().cloned()));

    let mut dispatchers = Vec::new();
    for replica in REPLICAS {
        let dispatcher = HashDispatcher::new(
            DispatcherConfig::new(replica),
            instances.clone(),
            consumers.clone(),
            Arc::new(NoopResyncTransport),
        )?;
        // Every replica observes the same membership signals.
        for member in REPLICAS {
            dispatcher.on_instance_up(member.to_string()).await?;
        }
        dispatchers.push((replica, dispatcher));
    }

    println!("--- three replicas up ---");
    for (replica, dispatcher) in &dispatchers {
        println!("{}", ownership_report(replica, dispatcher, &consumer_ids));
    }

    // replica-c dies: the listing shrinks and the survivors are signalled.
    instances.set(["replica-a", "replica-b"]);
    for (_, dispatcher) in &dispatchers[..2] {
        dispatcher.on_instance_down("replica-c".to_string()).await?;
    }

    println!("--- replica-c down ---");
    for (replica, dispatcher) in &dispatchers[..2] {
        println!("{}", ownership_report(replica, dispatcher, &consumer_ids));
    }

    Ok(())
}
