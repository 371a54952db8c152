//! Axum integration for stor
//!
//! [`PageCacheLayer`] caches whole `GET` responses through a
//! [`PageCache`](stor::PageCache); the [`Cache`] extractor hands the
//! application's [`Store`](stor::Store) to handlers.

pub mod extractor;
pub mod layer;
pub mod middleware;

pub use extractor::Cache;
pub use layer::PageCacheLayer;
pub use middleware::{PageCacheMiddleware, X_CACHE};
