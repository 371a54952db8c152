//! Relational store, configured the way an application would
//!
//! Defaults to a SQLite file; point `STOR__DB__URL` at MySQL or PostgreSQL
//! to try another engine.

use stor::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db_path = std::env::temp_dir().join("stor-example.db");
    let mut config = StoreConfig::from_toml(&format!(
        r#"
        storage_type = "relational"
        expiry_seconds = 300

        [db]
        url = "sqlite://{}?mode=rwc"
        create_table = true
        "#,
        db_path.display()
    ))?;

    // Environment overrides win over the document above
    let overrides = StoreConfig::load(None)?;
    if overrides.db.url.is_some() {
        config.db = overrides.db;
    }

    let store = Store::connect(&config).await;
    if store.is_disabled() {
        println!("cache disabled: {:?}", store.disabled_reason());
        return Ok(());
    }

    store.set(("user", 1), &serde_json::json!({"name": "Alice", "age": 31})).await?;
    println!("user:1 = {:?}", store.get_value(("user", 1)).await?);

    let expired = store.is_expired(("user", 1)).await?;
    println!("user:1 expired: {expired}");
    Ok(())
}
