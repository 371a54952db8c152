//! Shadow-entry freshness tracking for backends without native TTL

use std::sync::Arc;
use tracing::warn;

use stor_core::{Clock, Codec, JsonCodec, Result, StorageBackend, WriteOptions, expiry_key};

/// Records when each key was last written and answers freshness queries
///
/// The timestamp of key `K` lives in its own entry under
/// [`expiry_key`]`(K)`, written untracked so tracking never recurses.
pub struct ExpiryTracker<C: Codec = JsonCodec> {
    backend: Arc<dyn StorageBackend>,
    codec: Arc<C>,
    clock: Arc<dyn Clock>,
    expiry_seconds: u64,
}

impl<C: Codec> ExpiryTracker<C> {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        codec: Arc<C>,
        clock: Arc<dyn Clock>,
        expiry_seconds: u64,
    ) -> Self {
        Self {
            backend,
            codec,
            clock,
            expiry_seconds,
        }
    }

    /// Lifetime of a tracked write
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Stamp `key` as written now
    pub async fn touch(&self, key: &str) -> Result<()> {
        let now = self.clock.now_secs();
        let payload = self.codec.encode(&now)?;
        self.backend
            .put(&expiry_key(key), payload, &WriteOptions::new())
            .await
    }

    /// Timestamp of the last tracked write, if any
    ///
    /// A shadow entry that does not decode counts as missing.
    pub async fn last_write(&self, key: &str) -> Result<Option<u64>> {
        let Some(payload) = self.backend.get(&expiry_key(key)).await? else {
            return Ok(None);
        };
        match self.codec.decode::<u64>(&payload) {
            Ok(ts) => Ok(Some(ts)),
            Err(e) => {
                warn!(key, error = %e, "unreadable expiry entry, treating as expired");
                Ok(None)
            }
        }
    }

    /// Whether `key` was written less than `expiry_seconds` ago
    ///
    /// Keys never written through the tracked path are not fresh.
    pub async fn is_fresh(&self, key: &str) -> Result<bool> {
        let now = self.clock.now_secs();
        Ok(self
            .last_write(key)
            .await?
            .is_some_and(|ts| now < ts.saturating_add(self.expiry_seconds)))
    }

    /// Drop the shadow entry of `key`
    pub async fn forget(&self, key: &str) -> Result<bool> {
        self.backend.delete(&expiry_key(key)).await
    }
}

impl<C: Codec> Clone for ExpiryTracker<C> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            codec: self.codec.clone(),
            clock: self.clock.clone(),
            expiry_seconds: self.expiry_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stor_core::ManualClock;
    use stor_storage::{FileBackend, FileConfig};

    fn tracker(dir: &tempfile::TempDir, clock: &ManualClock) -> (ExpiryTracker, FileBackend) {
        let backend = FileBackend::new(FileConfig::new(dir.path()));
        let tracker = ExpiryTracker::new(
            Arc::new(backend.clone()),
            Arc::new(JsonCodec::default()),
            Arc::new(clock.clone()),
            60,
        );
        (tracker, backend)
    }

    #[tokio::test]
    async fn test_touch_writes_shadow_entry() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(1_700_000_000);
        let (tracker, backend) = tracker(&dir, &clock);

        tracker.touch("x").await.unwrap();

        let raw = backend.get("_stor__expiry_x").await.unwrap();
        assert_eq!(raw, Some(b"1700000000".to_vec()));
        assert_eq!(tracker.last_write("x").await.unwrap(), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_freshness_window() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let (tracker, _) = tracker(&dir, &clock);

        assert!(!tracker.is_fresh("x").await.unwrap());

        tracker.touch("x").await.unwrap();
        clock.set(59);
        assert!(tracker.is_fresh("x").await.unwrap());
        clock.set(60);
        assert!(!tracker.is_fresh("x").await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_shadow_entry_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let (tracker, backend) = tracker(&dir, &clock);

        backend
            .put("_stor__expiry_x", b"\"yesterday\"".to_vec(), &WriteOptions::new())
            .await
            .unwrap();

        assert_eq!(tracker.last_write("x").await.unwrap(), None);
        assert!(!tracker.is_fresh("x").await.unwrap());
    }

    #[tokio::test]
    async fn test_forget() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let (tracker, _) = tracker(&dir, &clock);

        tracker.touch("x").await.unwrap();
        assert!(tracker.forget("x").await.unwrap());
        assert!(!tracker.forget("x").await.unwrap());
        assert_eq!(tracker.last_write("x").await.unwrap(), None);
    }
}
