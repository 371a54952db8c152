use tower::Layer;

use stor::{CacheMetrics, Codec, JsonCodec, NoopMetrics, PageCache};

use crate::middleware::PageCacheMiddleware;

/// Wraps a service with whole-page caching
///
/// Intended for routes that render HTML; see [`PageCacheMiddleware`].
pub struct PageCacheLayer<C = JsonCodec, M = NoopMetrics>
where
    C: Codec,
    M: CacheMetrics,
{
    pages: PageCache<C, M>,
}

impl<C, M> PageCacheLayer<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    pub fn new(pages: PageCache<C, M>) -> Self {
        Self { pages }
    }
}

impl<C, M> Clone for PageCacheLayer<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            pages: self.pages.clone(),
        }
    }
}

impl<S, C, M> Layer<S> for PageCacheLayer<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    type Service = PageCacheMiddleware<S, C, M>;

    fn layer(&self, inner: S) -> Self::Service {
        PageCacheMiddleware::new(inner, self.pages.clone())
    }
}
