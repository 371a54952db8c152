//! Process-local distributed client using DashMap

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use stor_core::{Clock, Result, SystemClock};

use super::client::DistributedClient;

#[derive(Debug, Clone)]
struct Slot {
    value: Vec<u8>,
    /// Absolute expiry in epoch seconds
    expires_at: Option<u64>,
}

/// In-process stand-in for a memcache cluster
///
/// Honors native TTL against an injectable clock, which makes it the client
/// of choice for development and tests. Cloning creates a new handle to the
/// SAME underlying map.
#[derive(Clone)]
pub struct InMemoryClient {
    data: Arc<DashMap<String, Slot>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryClient {
    /// Create an empty client on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty client on a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now_secs();
        self.data
            .iter()
            .filter(|slot| !is_expired(slot.value(), now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_expired(slot: &Slot, now: u64) -> bool {
    slot.expires_at.is_some_and(|at| now >= at)
}

#[async_trait]
impl DistributedClient for InMemoryClient {
    fn protocol(&self) -> &'static str {
        "in-memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now_secs();
        match self.data.get(key) {
            Some(slot) if is_expired(&slot, now) => {
                drop(slot);
                self.data.remove_if(key, |_, slot| is_expired(slot, now));
                Ok(None)
            }
            Some(slot) => Ok(Some(slot.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: u32, _compress: bool) -> Result<()> {
        let expires_at = (ttl_secs > 0).then(|| self.clock.now_secs() + u64::from(ttl_secs));
        self.data.insert(
            key.to_string(),
            Slot {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_secs();
        Ok(self
            .data
            .remove(key)
            .is_some_and(|(_, slot)| !is_expired(&slot, now)))
    }

    async fn flush(&self) -> Result<()> {
        self.data.clear();
        Ok(())
    }
}
