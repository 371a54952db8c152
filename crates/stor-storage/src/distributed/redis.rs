//! Redis client pooled through bb8

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use stor_core::{Result, StorError};

use super::client::DistributedClient;
use crate::config::DistributedConfig;

/// Redis cluster client
///
/// Holds one pool per server; every key is routed to a single server by a
/// stable hash, so the same key always lands on the same member.
#[derive(Clone)]
pub struct RedisClient {
    pools: Vec<Pool<RedisConnectionManager>>,
}

impl RedisClient {
    /// Connect to every server in `config`
    ///
    /// Each pool is pinged once; any member that does not answer fails
    /// construction.
    pub async fn connect(config: &DistributedConfig) -> Result<Self> {
        let urls = config.server_urls();
        if urls.is_empty() {
            return Err(StorError::Construction(
                "no redis servers configured".to_string(),
            ));
        }

        let mut pools = Vec::with_capacity(urls.len());
        for url in &urls {
            let manager = RedisConnectionManager::new(url.as_str())
                .map_err(|e| StorError::construction("redis url", e))?;

            let pool = Pool::builder()
                .max_size(config.pool_size)
                .connection_timeout(config.connect_timeout)
                .build(manager)
                .await
                .map_err(|e| StorError::construction("build redis pool", e))?;

            {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| StorError::construction("connect redis", e))?;
                redis::cmd("PING")
                    .query_async::<String>(&mut *conn)
                    .await
                    .map_err(|e| StorError::construction("ping redis", e))?;
            }
            pools.push(pool);
        }

        info!(servers = pools.len(), "connected redis cluster");
        Ok(Self { pools })
    }

    /// Get a connection to the server owning `key`
    async fn connection_for(
        &self,
        key: &str,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>> {
        let index = (fnv1a(key.as_bytes()) % self.pools.len() as u64) as usize;
        self.pools[index]
            .get()
            .await
            .map_err(|e| StorError::unavailable("redis connection", e))
    }
}

/// 64-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[async_trait]
impl DistributedClient for RedisClient {
    fn protocol(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection_for(key).await?;
        let bytes: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| StorError::unavailable("redis get", e))?;
        Ok(bytes)
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: u32, _compress: bool) -> Result<()> {
        let mut conn = self.connection_for(key).await?;
        if ttl_secs > 0 {
            let _: () = conn
                .set_ex(key, value, u64::from(ttl_secs))
                .await
                .map_err(|e| StorError::unavailable("redis set", e))?;
        } else {
            let _: () = conn
                .set(key, value)
                .await
                .map_err(|e| StorError::unavailable("redis set", e))?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection_for(key).await?;
        let removed: usize = conn
            .del(key)
            .await
            .map_err(|e| StorError::unavailable("redis delete", e))?;
        Ok(removed > 0)
    }

    async fn flush(&self) -> Result<()> {
        for pool in &self.pools {
            let mut conn = pool
                .get()
                .await
                .map_err(|e| StorError::unavailable("redis connection", e))?;
            redis::cmd("FLUSHDB")
                .query_async::<()>(&mut *conn)
                .await
                .map_err(|e| StorError::unavailable("redis flush", e))?;
        }
        Ok(())
    }
}
