//! Storage backend trait

use async_trait::async_trait;

use crate::{Result, WriteOptions};

/// Core trait for all storage backends
///
/// A backend stores opaque, already-encoded payloads under string keys.
/// Implementations include the filesystem, a relational table and a
/// distributed memory cache.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Short backend name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Whether the backend expires entries by itself
    ///
    /// Backends without native TTL get freshness tracked through shadow
    /// expiry entries by the store.
    fn has_native_ttl(&self) -> bool {
        false
    }

    /// Insert or replace the payload stored under `key`
    ///
    /// Concurrent writers to the same key never interleave partial writes.
    async fn put(&self, key: &str, payload: Vec<u8>, options: &WriteOptions) -> Result<()>;

    /// Get the payload stored under `key`
    ///
    /// Returns `None` if the key was never written or has been deleted.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a key
    ///
    /// Returns `true` if the key existed. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every entry held by the backend
    async fn clear(&self) -> Result<()>;
}
