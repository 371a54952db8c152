//! Client abstraction over a distributed memory cache

use async_trait::async_trait;

use stor_core::Result;

/// Minimal command set a distributed memory cache must offer
#[async_trait]
pub trait DistributedClient: Send + Sync + 'static {
    /// Wire protocol name, for logs
    fn protocol(&self) -> &'static str;

    /// Fetch a value
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value
    ///
    /// `ttl_secs == 0` means the entry never expires. `compress` is passed
    /// through from configuration; clients without compression ignore it.
    async fn set(&self, key: &str, value: &[u8], ttl_secs: u32, compress: bool) -> Result<()>;

    /// Remove a value, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Drop every entry on every server
    async fn flush(&self) -> Result<()>;
}
