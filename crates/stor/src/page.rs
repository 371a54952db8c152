//! Whole-page caching
//!
//! [`PageCache::serve_page`] either replays a cached body or hands out a
//! [`PageCapture`] that collects the body being rendered. The capture is
//! persisted by [`PageCapture::finish`]; a capture that is dropped instead
//! (early return, `?`, panic unwinding) is persisted in the background.

use std::io;
use std::mem;
use tracing::{debug, warn};

use stor_core::{
    CacheMetrics, Codec, JsonCodec, NoopMetrics, Result, StorError, expiry_key, page_key,
};

use crate::store::Store;

/// Page cache over a [`Store`]
pub struct PageCache<C = JsonCodec, M = NoopMetrics>
where
    C: Codec,
    M: CacheMetrics,
{
    store: Store<C, M>,
}

/// Result of looking up a page
pub enum PageOutcome<C = JsonCodec, M = NoopMetrics>
where
    C: Codec,
    M: CacheMetrics,
{
    /// Cached body, ready to send
    Hit(String),
    /// Nothing cached; render into the capture
    Miss(PageCapture<C, M>),
}

impl<C, M> PageCache<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    pub fn new(store: Store<C, M>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Store<C, M> {
        &self.store
    }

    /// Look up the page for `request_uri` (path plus query string)
    pub async fn serve_page(&self, request_uri: &str) -> Result<PageOutcome<C, M>> {
        let key = page_key(request_uri);
        match self.store.get::<String>(&key).await? {
            Some(body) => {
                debug!(uri = request_uri, "page cache hit");
                Ok(PageOutcome::Hit(body))
            }
            None => {
                debug!(uri = request_uri, "page cache miss, capturing");
                Ok(PageOutcome::Miss(PageCapture::new(self.store.clone(), key)))
            }
        }
    }

    /// Cache an already rendered body for `request_uri`
    ///
    /// For callers that only know the body once rendering has finished and
    /// must not cache anything if rendering is abandoned.
    pub async fn cache_page(&self, request_uri: &str, body: &[u8]) -> Result<()> {
        persist(&self.store, &page_key(request_uri), body).await
    }

    /// Drop the cached page for `request_uri`
    pub async fn invalidate(&self, request_uri: &str) -> Result<bool> {
        self.store.delete(page_key(request_uri)).await
    }
}

impl<C, M> Clone for PageCache<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

/// Collects a rendered body and caches it once rendering is done
///
/// One capture per request: it cannot be cloned and is consumed by
/// [`finish`](Self::finish) or [`discard`](Self::discard).
pub struct PageCapture<C = JsonCodec, M = NoopMetrics>
where
    C: Codec,
    M: CacheMetrics,
{
    store: Store<C, M>,
    page_key: String,
    buffer: Vec<u8>,
    armed: bool,
}

impl<C, M> PageCapture<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn new(store: Store<C, M>, page_key: String) -> Self {
        Self {
            store,
            page_key,
            buffer: Vec::new(),
            armed: true,
        }
    }

    /// Key the page will be stored under
    pub fn page_key(&self) -> &str {
        &self.page_key
    }

    /// Bytes captured so far
    pub fn body(&self) -> &[u8] {
        &self.buffer
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.append(s.as_bytes());
    }

    /// Cache the captured body and return it for sending
    pub async fn finish(mut self) -> Result<Vec<u8>> {
        self.armed = false;
        let body = mem::take(&mut self.buffer);
        persist(&self.store, &self.page_key, &body).await?;
        Ok(body)
    }

    /// Throw the capture away without caching anything
    pub fn discard(mut self) {
        self.armed = false;
        debug!(key = %self.page_key, "page capture discarded");
    }
}

async fn persist<C, M>(store: &Store<C, M>, page_key: &str, body: &[u8]) -> Result<()>
where
    C: Codec,
    M: CacheMetrics,
{
    let text = std::str::from_utf8(body)
        .map_err(|e| StorError::Encoding(format!("page body is not UTF-8: {e}")))?;
    store.set(page_key, text).await?;
    // The page stamp is also written explicitly so it exists on every backend
    store
        .set_untracked(expiry_key(page_key), &store.now_secs())
        .await?;
    debug!(key = page_key, bytes = body.len(), "page cached");
    Ok(())
}

impl<C, M> io::Write for PageCapture<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C, M> Drop for PageCapture<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        let store = self.store.clone();
        let page_key = mem::take(&mut self.page_key);
        let body = mem::take(&mut self.buffer);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = persist(&store, &page_key, &body).await {
                        warn!(key = %page_key, error = %e, "failed to cache dropped page capture");
                    }
                });
            }
            Err(_) => {
                warn!(key = %page_key, "page capture dropped outside a runtime, not cached");
            }
        }
    }
}
