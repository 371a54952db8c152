use axum::{Router, response::IntoResponse, routing::get};
use stor::prelude::*;
use stor_axum::{Cache, PageCacheLayer};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let store = Store::connect(&StoreConfig::file("cache").expiry_seconds(60)).await;

    // Only the home page is cached whole; `/visits` reads the store itself
    let pages = PageCacheLayer::new(PageCache::new(store.clone()));
    let app = Router::new()
        .route("/", get(home).layer(pages))
        .route("/visits", get(visits))
        .with_state(store);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    println!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Rendered once a minute, then served by the layer
async fn home() -> impl IntoResponse {
    "<h1>Welcome</h1>"
}

/// Manual access using the `Cache` extractor
async fn visits(Cache(store): Cache) -> impl IntoResponse {
    let seen = store.get::<u64>("visits").await.ok().flatten().unwrap_or(0) + 1;
    if let Err(e) = store.set("visits", &seen).await {
        eprintln!("could not record visit: {e}");
    }
    format!("<p>{seen} visits</p>")
}
