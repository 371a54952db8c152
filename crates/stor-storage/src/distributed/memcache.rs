//! Memcached client over the text protocol

use async_trait::async_trait;
use memcache::Client;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

use stor_core::{Result, StorError};

use super::client::DistributedClient;
use crate::config::DistributedConfig;

/// Memcached treats larger expirations as absolute Unix timestamps
const MAX_RELATIVE_TTL: u32 = 60 * 60 * 24 * 30;

/// Longest key memcached accepts
const MAX_KEY_LEN: usize = 250;

/// Memcached cluster client
///
/// The underlying client is synchronous; every command runs on the blocking
/// pool.
#[derive(Clone)]
pub struct MemcacheClient {
    client: Arc<Client>,
}

impl MemcacheClient {
    /// Connect to every server in `config`
    ///
    /// Each member must answer `version`, otherwise construction fails.
    pub async fn connect(config: &DistributedConfig) -> Result<Self> {
        let timeout = config.connect_timeout;
        let urls: Vec<String> = config
            .server_urls()
            .iter()
            .map(|url| with_connect_timeout(url, timeout))
            .collect();
        if urls.is_empty() {
            return Err(StorError::Construction(
                "no memcache servers configured".to_string(),
            ));
        }

        let connect = tokio::task::spawn_blocking(move || {
            let client = Client::connect(urls)
                .map_err(|e| StorError::construction("connect memcache", e))?;
            client
                .version()
                .map_err(|e| StorError::construction("memcache version check", e))?;
            Ok::<_, StorError>(client)
        });

        let client = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| StorError::Construction("memcache connect timed out".to_string()))?
            .map_err(|e| StorError::construction("memcache connect task", e))??;

        info!(servers = config.servers.len(), "connected memcache cluster");
        Ok(Self {
            client: Arc::new(client),
        })
    }

    async fn run<T, F>(&self, context: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Client) -> std::result::Result<T, memcache::MemcacheError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || f(&client))
            .await
            .map_err(|e| StorError::unavailable(context, e))?
            .map_err(|e| StorError::unavailable(context, e))
    }
}

/// Bound how long the connection pool retries an unreachable server
fn with_connect_timeout(url: &str, timeout: Duration) -> String {
    format!("{url}?connect_timeout={}", timeout.as_secs_f64())
}

fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key.len() > MAX_KEY_LEN
        || key.chars().any(|c| c.is_whitespace() || c.is_control());
    if invalid {
        return Err(StorError::InvalidKey(format!(
            "{key:?} is not a valid memcache key"
        )));
    }
    Ok(())
}

/// Convert a relative TTL into what memcached expects on the wire
fn wire_expiration(ttl_secs: u32) -> u32 {
    if ttl_secs <= MAX_RELATIVE_TTL {
        return ttl_secs;
    }
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    u32::try_from(now + u64::from(ttl_secs)).unwrap_or(u32::MAX)
}

#[async_trait]
impl DistributedClient for MemcacheClient {
    fn protocol(&self) -> &'static str {
        "memcache"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let key = key.to_string();
        self.run("memcache get", move |c| c.get::<Vec<u8>>(&key)).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: u32, _compress: bool) -> Result<()> {
        validate_key(key)?;
        let key = key.to_string();
        let value = value.to_vec();
        let expiration = wire_expiration(ttl_secs);
        self.run("memcache set", move |c| c.set(&key, value.as_slice(), expiration))
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let key = key.to_string();
        self.run("memcache delete", move |c| c.delete(&key)).await
    }

    async fn flush(&self) -> Result<()> {
        self.run("memcache flush", |c| c.flush()).await
    }
}
