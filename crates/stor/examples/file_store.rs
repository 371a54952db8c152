//! File-backed store with expiry, metrics logged through tracing
//!
//! Run with `RUST_LOG=stor=trace cargo run --example file_store`.

use std::sync::Arc;

use stor::prelude::*;
use stor::{FileBackend, FileConfig, TracingMetrics};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let dir = std::env::temp_dir().join("stor-example");
    let store = Store::with_codec_and_metrics(
        Arc::new(FileBackend::new(FileConfig::new(&dir))),
        StoreOptions::expiry_seconds(60),
        JsonCodec::default(),
        TracingMetrics::new().with_service_name("file-example"),
    );

    store.set("foo", &["baz", "bat", "bar"]).await?;
    println!("foo = {:?}", store.get::<Vec<String>>("foo").await?);

    let greeting = store
        .get_or_refresh("greeting", || async { Some("hello".to_string()) })
        .await?;
    println!("greeting = {greeting:?}");

    store.delete("foo").await?;
    println!("after delete: {:?}", store.get::<Vec<String>>("foo").await?);

    store.clear().await?;
    println!("cache directory {} cleared", dir.display());
    Ok(())
}
