//! Distributed memory store on redis
//!
//! Set `REDIS_HOST`/`REDIS_PORT` to point at a server; without one the
//! store starts disabled and the program still runs.

use std::collections::BTreeMap;

use stor::prelude::*;
use stor::DistributedProtocol;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379);

    let mut config = StoreConfig::distributed(BTreeMap::from([(host, port)])).expiry_seconds(30);
    config.distributed_protocol = DistributedProtocol::Redis;

    let store = Store::connect(&config).await;
    println!("backend: {:?}", store.backend_name());

    store.set("hello", &"world").await?;
    match store.get::<String>("hello").await? {
        Some(value) => println!("Hit: {value}"),
        None => println!("Miss"),
    }

    let counter = store
        .get_or_refresh("counter", || async { Some(1u64) })
        .await?;
    println!("counter: {counter:?}");
    Ok(())
}
