//! Whole-page caching without a web framework

use stor::prelude::*;
use std::io::Write;

async fn render(page: &PageCache, uri: &str) -> Result<String> {
    match page.serve_page(uri).await? {
        PageOutcome::Hit(body) => Ok(body),
        PageOutcome::Miss(mut capture) => {
            write!(capture, "<h1>rendered {uri}</h1>").map_err(|e| StorError::Encoding(e.to_string()))?;
            let body = capture.finish().await?;
            Ok(String::from_utf8_lossy(&body).into_owned())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir().join("stor-pages");
    let store = Store::connect(&StoreConfig::file(&dir).expiry_seconds(10)).await;
    let pages = PageCache::new(store);

    for _ in 0..2 {
        let body = render(&pages, "/blog/hello?lang=en").await?;
        println!("{body}");
    }

    pages.invalidate("/blog/hello?lang=en").await?;
    Ok(())
}
