use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, Response, StatusCode, header},
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower_service::Service;
use tracing::{debug, warn};

use stor::{CacheMetrics, Codec, JsonCodec, NoopMetrics, PageCache, PageOutcome};

/// Response header reporting whether the page came from the cache
pub const X_CACHE: &str = "x-cache";

/// Serves cached pages and captures `200 OK` bodies of `GET` requests
///
/// Meant for HTML routes: only the body is cached, and hits are always
/// served as `text/html; charset=utf-8` without the original headers.
/// Cache failures are logged and never fail the request.
pub struct PageCacheMiddleware<S, C = JsonCodec, M = NoopMetrics>
where
    C: Codec,
    M: CacheMetrics,
{
    inner: S,
    pages: PageCache<C, M>,
}

impl<S, C, M> PageCacheMiddleware<S, C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    pub fn new(inner: S, pages: PageCache<C, M>) -> Self {
        Self { inner, pages }
    }
}

impl<S, C, M> Clone for PageCacheMiddleware<S, C, M>
where
    S: Clone,
    C: Codec,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            pages: self.pages.clone(),
        }
    }
}

impl<S, C, M> Service<Request<Body>> for PageCacheMiddleware<S, C, M>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    C: Codec,
    M: CacheMetrics,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Keep the service that was polled ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let pages = self.pages.clone();

        Box::pin(async move {
            let method = req.method().clone();
            if method != Method::GET && method != Method::HEAD {
                return inner.call(req).await;
            }

            let uri = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.uri().path().to_string());

            match pages.serve_page(&uri).await {
                Ok(PageOutcome::Hit(body)) => {
                    debug!(uri = %uri, "serving cached page");
                    return Ok(cached_response(body, method == Method::HEAD));
                }
                // Cached only once the whole body has been produced
                Ok(PageOutcome::Miss(capture)) => capture.discard(),
                Err(e) => {
                    warn!(uri = %uri, error = %e, "page cache lookup failed");
                    return inner.call(req).await;
                }
            }

            let response = inner.call(req).await?;
            if method == Method::HEAD || response.status() != StatusCode::OK {
                return Ok(mark_miss(response));
            }

            let (mut parts, body) = response.into_parts();
            let bytes = match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(uri = %uri, error = %e, "failed to read response body");
                    return Ok(Response::from_parts(parts, Body::empty()));
                }
            };

            if let Err(e) = pages.cache_page(&uri, &bytes).await {
                warn!(uri = %uri, error = %e, "failed to cache page");
            }

            parts
                .headers
                .insert(X_CACHE, HeaderValue::from_static("MISS"));
            Ok(Response::from_parts(parts, Body::from(bytes)))
        })
    }
}

fn cached_response(body: String, head: bool) -> Response<Body> {
    let body = if head { Body::empty() } else { Body::from(body) };
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(X_CACHE, HeaderValue::from_static("HIT"));
    response
}

fn mark_miss(mut response: Response<Body>) -> Response<Body> {
    response.headers_mut().insert(X_CACHE, HeaderValue::from_static("MISS"));
    response
}
