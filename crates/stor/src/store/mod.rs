//! The cache facade

mod config;
mod expiry;

pub use config::{ENV_PREFIX, StorageType, StoreConfig};
pub use expiry::ExpiryTracker;

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use stor_core::{
    CacheKey, CacheMetrics, CacheOperation, Clock, Codec, GetOptions, JsonCodec, NoopMetrics,
    RefreshResult, Result, StorageBackend, SystemClock, WriteOptions,
};
use stor_storage::{DistributedBackend, FileBackend};

/// Store-wide settings that apply to every backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Entry lifetime; `None` keeps entries forever
    pub expiry_seconds: Option<u64>,
}

impl StoreOptions {
    /// Entries never expire
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries expire `seconds` after their last write
    pub fn expiry_seconds(seconds: u64) -> Self {
        Self {
            expiry_seconds: Some(seconds),
        }
    }
}

#[derive(Clone)]
enum Engine {
    Ready(Arc<dyn StorageBackend>),
    /// Construction failed; every operation is a silent no-op
    Disabled(Arc<str>),
}

/// Key/value cache over a pluggable backend
///
/// Generic over:
/// - `C`: the payload codec (JSON by default)
/// - `M`: the metrics collector
///
/// On backends without native TTL, freshness is tracked through shadow
/// expiry entries. Cloning creates a new handle to the SAME backend.
pub struct Store<C = JsonCodec, M = NoopMetrics>
where
    C: Codec,
    M: CacheMetrics,
{
    engine: Engine,
    tracker: Option<ExpiryTracker<C>>,
    codec: Arc<C>,
    metrics: Arc<M>,
    clock: Arc<dyn Clock>,
    options: StoreOptions,
}

// Constructors for default codec/metrics
impl Store<JsonCodec, NoopMetrics> {
    /// Build the backend described by `config`, failing open
    ///
    /// A backend that cannot be constructed is logged and yields a disabled
    /// store: reads miss and writes are discarded, without errors.
    pub async fn connect(config: &StoreConfig) -> Self {
        match Self::try_connect(config).await {
            Ok(store) => store,
            Err(e) => {
                error!(
                    storage_type = ?config.storage_type,
                    error = %e,
                    "cache backend unavailable, caching disabled"
                );
                Self::disabled(e.to_string())
            }
        }
    }

    /// Build the backend described by `config`, surfacing construction errors
    pub async fn try_connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let backend = open_backend(config).await?;
        Ok(Self::with_codec_and_metrics(
            backend,
            StoreOptions {
                expiry_seconds: config.expiry_seconds,
            },
            JsonCodec::new(config.decode_shape()),
            NoopMetrics,
        ))
    }

    /// Build a store over any backend
    pub fn with_backend(backend: impl StorageBackend, options: StoreOptions) -> Self {
        Self::with_codec_and_metrics(
            Arc::new(backend),
            options,
            JsonCodec::default(),
            NoopMetrics,
        )
    }

    /// A store that caches nothing
    pub fn disabled(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self {
            engine: Engine::Disabled(reason.into()),
            tracker: None,
            codec: Arc::new(JsonCodec::default()),
            metrics: Arc::new(NoopMetrics),
            clock: Arc::new(SystemClock),
            options: StoreOptions::default(),
        }
    }
}

async fn open_backend(config: &StoreConfig) -> Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.storage_type {
        StorageType::File => Arc::new(FileBackend::new(config.file_config())),
        #[cfg(feature = "sql")]
        StorageType::Relational => Arc::new(stor_storage::SqlBackend::connect(&config.db).await?),
        #[cfg(not(feature = "sql"))]
        StorageType::Relational => {
            return Err(stor_core::StorError::Construction(
                "relational support is not compiled in".to_string(),
            ));
        }
        StorageType::DistributedMemory => {
            Arc::new(DistributedBackend::connect(&config.distributed_config()).await?)
        }
    };
    Ok(backend)
}

// Full generic implementation
impl<C, M> Store<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    /// Create a store with a custom codec and metrics
    pub fn with_codec_and_metrics(
        backend: Arc<dyn StorageBackend>,
        options: StoreOptions,
        codec: C,
        metrics: M,
    ) -> Self {
        let mut store = Self {
            engine: Engine::Ready(backend),
            tracker: None,
            codec: Arc::new(codec),
            metrics: Arc::new(metrics),
            clock: Arc::new(SystemClock),
            options,
        };
        store.tracker = store.build_tracker();
        store
    }

    /// Replace the clock used for expiry bookkeeping
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self.tracker = self.build_tracker();
        self
    }

    fn build_tracker(&self) -> Option<ExpiryTracker<C>> {
        let Engine::Ready(backend) = &self.engine else {
            return None;
        };
        let expiry = self.options.expiry_seconds?;
        if backend.has_native_ttl() {
            return None;
        }
        Some(ExpiryTracker::new(
            backend.clone(),
            self.codec.clone(),
            self.clock.clone(),
            expiry,
        ))
    }

    /// Whether construction failed and the store is a no-op
    pub fn is_disabled(&self) -> bool {
        matches!(self.engine, Engine::Disabled(_))
    }

    /// Why the store is disabled, if it is
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.engine {
            Engine::Disabled(reason) => Some(reason.as_ref()),
            Engine::Ready(_) => None,
        }
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> Option<&'static str> {
        match &self.engine {
            Engine::Ready(backend) => Some(backend.name()),
            Engine::Disabled(_) => None,
        }
    }

    /// Store-wide settings
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// The codec in use
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The metrics collector in use
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Current time according to the store's clock
    pub fn now_secs(&self) -> u64 {
        self.clock.now_secs()
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions {
            ttl: self.options.expiry_seconds.map(Duration::from_secs),
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let start = Instant::now();
        let payload = self.codec.encode(value)?;
        self.metrics
            .record_latency(CacheOperation::Encode, start.elapsed());
        Ok(payload)
    }

    /// Write a payload to the backend only
    async fn raw_set(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        let Engine::Ready(backend) = &self.engine else {
            return Ok(());
        };
        let start = Instant::now();
        backend.put(key, payload, &self.write_options()).await?;
        self.metrics
            .record_latency(CacheOperation::Set, start.elapsed());
        Ok(())
    }

    /// Write a payload and stamp its freshness
    async fn tracked_set(&self, key: &str, payload: Vec<u8>) -> Result<()> {
        self.raw_set(key, payload).await?;
        if let Some(tracker) = &self.tracker {
            tracker.touch(key).await?;
        }
        Ok(())
    }

    /// Set a value in cache
    ///
    /// Resets the entry's expiry when expiry is tracked.
    pub async fn set<T>(&self, key: impl CacheKey, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if self.is_disabled() {
            return Ok(());
        }
        let key = key.cache_key();
        let payload = self.encode(value)?;
        self.tracked_set(&key, payload).await?;
        debug!(key = %key, "cache set");
        Ok(())
    }

    /// Set a value without touching its expiry stamp
    pub async fn set_untracked<T>(&self, key: impl CacheKey, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if self.is_disabled() {
            return Ok(());
        }
        let key = key.cache_key();
        let payload = self.encode(value)?;
        self.raw_set(&key, payload).await
    }

    /// Fetch the raw payload, honoring expiry unless told otherwise
    async fn fetch(&self, key: &str, options: GetOptions) -> Result<Option<Vec<u8>>> {
        let Engine::Ready(backend) = &self.engine else {
            return Ok(None);
        };
        let start = Instant::now();

        if let Some(tracker) = &self.tracker {
            if !options.ignore_expiry && !tracker.is_fresh(key).await? {
                self.metrics.record_expired(key);
                self.metrics
                    .record_latency(CacheOperation::Get, start.elapsed());
                return Ok(None);
            }
        }

        let payload = backend.get(key).await?;
        match &payload {
            Some(_) => self.metrics.record_hit(key, backend.name()),
            None => self.metrics.record_miss(key, backend.name()),
        }
        self.metrics
            .record_latency(CacheOperation::Get, start.elapsed());
        Ok(payload)
    }

    /// Get a value from cache
    ///
    /// Returns `None` when the key is absent or its expiry has passed.
    pub async fn get<T>(&self, key: impl CacheKey) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.get_with(key, GetOptions::default()).await
    }

    /// Get a value from cache with per-read options
    pub async fn get_with<T>(&self, key: impl CacheKey, options: GetOptions) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let key = key.cache_key();
        let Some(payload) = self.fetch(&key, options).await? else {
            return Ok(None);
        };
        let start = Instant::now();
        let value = self.codec.decode(&payload)?;
        self.metrics
            .record_latency(CacheOperation::Decode, start.elapsed());
        Ok(Some(value))
    }

    /// Get a value as a dynamic JSON document
    ///
    /// Objects come back as mappings or records depending on the codec's
    /// decode shape.
    pub async fn get_value(&self, key: impl CacheKey) -> Result<Option<serde_json::Value>> {
        let key = key.cache_key();
        let Some(payload) = self.fetch(&key, GetOptions::default()).await? else {
            return Ok(None);
        };
        self.codec.decode_value(&payload).map(Some)
    }

    /// Whether the entry under `key` should be refreshed
    ///
    /// With native TTL an entry is expired exactly when it is gone. With
    /// tracked expiry it is expired when its stamp is missing or too old.
    /// Without any expiry nothing expires.
    pub async fn is_expired(&self, key: impl CacheKey) -> Result<bool> {
        let Engine::Ready(backend) = &self.engine else {
            return Ok(true);
        };
        let key = key.cache_key();
        if backend.has_native_ttl() {
            return Ok(backend.get(&key).await?.is_none());
        }
        match &self.tracker {
            Some(tracker) => Ok(!tracker.is_fresh(&key).await?),
            None => Ok(false),
        }
    }

    /// Delete a key and its expiry stamp
    ///
    /// Succeeds whether or not the key existed.
    pub async fn delete(&self, key: impl CacheKey) -> Result<bool> {
        let Engine::Ready(backend) = &self.engine else {
            return Ok(true);
        };
        let key = key.cache_key();
        let start = Instant::now();
        let existed = backend.delete(&key).await?;
        if let Some(tracker) = &self.tracker {
            tracker.forget(&key).await?;
        }
        self.metrics
            .record_latency(CacheOperation::Delete, start.elapsed());
        debug!(key = %key, existed, "cache delete");
        Ok(true)
    }

    /// Remove every entry from the backend
    pub async fn clear(&self) -> Result<()> {
        let Engine::Ready(backend) = &self.engine else {
            return Ok(());
        };
        let start = Instant::now();
        backend.clear().await?;
        self.metrics
            .record_latency(CacheOperation::Clear, start.elapsed());
        Ok(())
    }

    /// Get a fresh value, or recompute it with `refresh`
    ///
    /// When the entry is expired or missing, `refresh` runs once. A value it
    /// returns is stored and handed back. If it returns `None`, the stale
    /// value (if any) is re-written to restart its expiry window and handed
    /// back as [`RefreshResult::RefreshFailed`].
    ///
    /// Concurrent callers are not coordinated: each may run `refresh`, and
    /// the last write wins.
    pub async fn get_or_refresh<T, F, Fut>(
        &self,
        key: impl CacheKey,
        refresh: F,
    ) -> Result<RefreshResult<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        if self.is_disabled() {
            return Ok(RefreshResult::Disabled);
        }
        let key = key.cache_key();

        if !self.is_expired(&key).await? {
            if let Some(value) = self.get::<T>(&key).await? {
                return Ok(RefreshResult::Fresh(value));
            }
        }

        let start = Instant::now();
        let refreshed = refresh().await;
        self.metrics
            .record_latency(CacheOperation::Refresh, start.elapsed());

        match refreshed {
            Some(value) => {
                self.set(&key, &value).await?;
                Ok(RefreshResult::Refreshed(value))
            }
            None => {
                let stale = self
                    .get_with::<T>(&key, GetOptions::ignore_expiry())
                    .await?;
                if let Some(value) = &stale {
                    self.set(&key, value).await?;
                }
                warn!(
                    key = %key,
                    has_stale = stale.is_some(),
                    "unable to refresh cache entry"
                );
                Ok(RefreshResult::RefreshFailed(stale))
            }
        }
    }
}

impl<C, M> Clone for Store<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            tracker: self.tracker.clone(),
            codec: self.codec.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
            options: self.options,
        }
    }
}

impl<C, M> fmt::Debug for Store<C, M>
where
    C: Codec,
    M: CacheMetrics,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Store");
        match &self.engine {
            Engine::Ready(backend) => s.field("backend", &backend.name()),
            Engine::Disabled(reason) => s.field("disabled", reason),
        };
        s.field("codec", &self.codec.name())
            .field("expiry_seconds", &self.options.expiry_seconds)
            .field("tracked", &self.tracker.is_some())
            .finish()
    }
}
