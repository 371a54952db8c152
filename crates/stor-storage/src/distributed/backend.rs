//! Backend adapter over a [`DistributedClient`]

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use stor_core::{Result, StorError, StorageBackend, WriteOptions};

use super::client::DistributedClient;
use crate::config::{DistributedConfig, DistributedProtocol};

/// Distributed memory backend
///
/// Entries expire natively on the servers, so the store never layers
/// shadow expiry entries on top. Cloning creates a new handle to the SAME
/// client.
#[derive(Clone)]
pub struct DistributedBackend {
    client: Arc<dyn DistributedClient>,
    compression: bool,
}

impl DistributedBackend {
    /// Wrap an already connected client
    pub fn new(client: Arc<dyn DistributedClient>, compression: bool) -> Self {
        Self {
            client,
            compression,
        }
    }

    /// Connect the client selected by `config.protocol`
    pub async fn connect(config: &DistributedConfig) -> Result<Self> {
        if config.servers.is_empty() {
            return Err(StorError::Construction(
                "no distributed memory servers configured".to_string(),
            ));
        }

        let client: Arc<dyn DistributedClient> = match config.protocol {
            #[cfg(feature = "memcache")]
            DistributedProtocol::Memcache => {
                Arc::new(super::MemcacheClient::connect(config).await?)
            }
            #[cfg(feature = "redis")]
            DistributedProtocol::Redis => Arc::new(super::RedisClient::connect(config).await?),
            #[allow(unreachable_patterns)]
            other => {
                return Err(StorError::Construction(format!(
                    "{other:?} support is not compiled in"
                )));
            }
        };

        Ok(Self::new(client, config.compression))
    }

    /// Protocol of the wrapped client
    pub fn protocol(&self) -> &'static str {
        self.client.protocol()
    }
}

/// Native TTL in whole seconds; 0 means no expiry
fn ttl_secs(options: &WriteOptions) -> u32 {
    match options.ttl {
        None => 0,
        Some(ttl) => {
            // Sub-second TTLs round up rather than turning into "forever"
            let secs = ttl.as_secs().max(1);
            u32::try_from(secs).unwrap_or(u32::MAX)
        }
    }
}

#[async_trait]
impl StorageBackend for DistributedBackend {
    fn name(&self) -> &'static str {
        "distributed_memory"
    }

    fn has_native_ttl(&self) -> bool {
        true
    }

    async fn put(&self, key: &str, payload: Vec<u8>, options: &WriteOptions) -> Result<()> {
        let ttl = ttl_secs(options);
        self.client
            .set(key, &payload, ttl, self.compression)
            .await?;
        debug!(key, ttl, protocol = self.client.protocol(), "stored distributed entry");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.client.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.client.delete(key).await
    }

    async fn clear(&self) -> Result<()> {
        warn!(
            protocol = self.client.protocol(),
            "flushing distributed cache; unrelated keys on the same servers are dropped too"
        );
        self.client.flush().await
    }
}
