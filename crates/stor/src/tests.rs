//! Integration tests for Store

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::{
        CacheMetrics, CacheOperation, DecodeShape, DistributedBackend, InMemoryClient,
        ManualClock, NoopMetrics, StorageBackend,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct TestData {
        id: u64,
        name: String,
        value: i32,
    }

    fn file_store(dir: &tempfile::TempDir, options: StoreOptions, clock: &ManualClock) -> Store {
        Store::with_backend(FileBackend::new(FileConfig::new(dir.path())), options)
            .with_clock(Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_basic_get_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        store.set("foo", &["baz", "bat", "bar"]).await.unwrap();
        let value: Option<Vec<String>> = store.get("foo").await.unwrap();
        assert_eq!(value.unwrap(), ["baz", "bat", "bar"]);

        assert!(store.delete("foo").await.unwrap());
        assert!(store.get::<Vec<String>>("foo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_struct_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        let data = TestData {
            id: 1,
            name: "test".to_string(),
            value: 42,
        };
        store.set("test_key", &data).await.unwrap();

        assert_eq!(store.get::<TestData>("test_key").await.unwrap(), Some(data));
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        assert!(store.get::<TestData>("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &ManualClock::new(0));

        assert!(store.delete("never_written").await.unwrap());
        store.set("key", &1).await.unwrap();
        assert!(store.delete("key").await.unwrap());
        assert!(store.delete("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_expiry_window() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &clock);

        store.set("x", &1).await.unwrap();

        clock.set(30);
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(1));
        assert!(!store.is_expired("x").await.unwrap());

        clock.set(59);
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(1));

        clock.set(61);
        assert_eq!(store.get::<i32>("x").await.unwrap(), None);
        assert!(store.is_expired("x").await.unwrap());
        assert_eq!(
            store
                .get_with::<i32>("x", GetOptions::ignore_expiry())
                .await
                .unwrap(),
            Some(1)
        );

        // A new write restarts the window
        store.set("x", &2).await.unwrap();
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_no_expiry_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = file_store(&dir, StoreOptions::new(), &clock);

        store.set("x", &"forever").await.unwrap();
        clock.advance(10 * 365 * 24 * 3600);

        assert_eq!(store.get::<String>("x").await.unwrap().as_deref(), Some("forever"));
        assert!(!store.is_expired("x").await.unwrap());
        // Nothing tracked, so no shadow entry was written
        assert!(
            store
                .get_with::<u64>("_stor__expiry_x", GetOptions::ignore_expiry())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &ManualClock::new(0));

        store.set("key1", &1).await.unwrap();
        store.set("key2", &2).await.unwrap();

        store.clear().await.unwrap();

        for key in ["key1", "key2", "_stor__expiry_key1"] {
            assert!(
                store
                    .get_with::<i32>(key, GetOptions::ignore_expiry())
                    .await
                    .unwrap()
                    .is_none()
            );
        }
    }

    #[tokio::test]
    async fn test_tuple_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        store.set(("user", 123), &"alice").await.unwrap();

        let value: Option<String> = store.get("user:123").await.unwrap();
        assert_eq!(value.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_clone_shares_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));
        let handle = store.clone();

        handle.set("shared", &7).await.unwrap();
        assert_eq!(store.get::<i32>("shared").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_delete_removes_shadow_entry() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &clock);

        store.set("x", &1).await.unwrap();
        store.delete("x").await.unwrap();

        // An untracked write after delete has no stamp, so it reads as expired
        store.set_untracked("x", &2).await.unwrap();
        assert!(store.get::<i32>("x").await.unwrap().is_none());
        assert!(store.is_expired("x").await.unwrap());
        assert_eq!(
            store
                .get_with::<i32>("x", GetOptions::ignore_expiry())
                .await
                .unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_set_untracked_keeps_old_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &clock);

        store.set("x", &1).await.unwrap();
        clock.set(50);
        store.set_untracked("x", &2).await.unwrap();

        clock.set(61);
        assert!(store.get::<i32>("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_encoding_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        store.set("name", &"alice").await.unwrap();
        let err = store.get::<u32>("name").await.unwrap_err();
        assert!(matches!(err, StorError::Encoding(_)));

        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "tuple keys are not JSON object keys");
        let err = store.set("bad", &bad).await.unwrap_err();
        assert!(matches!(err, StorError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_invalid_file_key_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        let err = store.set("../escape", &1).await.unwrap_err();
        assert!(matches!(err, StorError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_get_value_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> = Arc::new(FileBackend::new(FileConfig::new(dir.path())));

        let mapping = Store::with_codec_and_metrics(
            backend.clone(),
            StoreOptions::new(),
            JsonCodec::new(DecodeShape::Mapping),
            NoopMetrics,
        );
        let record = Store::with_codec_and_metrics(
            backend,
            StoreOptions::new(),
            JsonCodec::new(DecodeShape::Record),
            NoopMetrics,
        );

        let doc: serde_json::Value = serde_json::from_str(r#"{"zeta":1,"alpha":2}"#).unwrap();
        mapping.set("doc", &doc).await.unwrap();

        let as_mapping = mapping.get_value("doc").await.unwrap().unwrap();
        let keys: Vec<&String> = as_mapping.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha"]);

        let as_record = record.get_value("doc").await.unwrap().unwrap();
        let keys: Vec<&String> = as_record.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_get_or_refresh_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &ManualClock::new(0));

        store.set("x", &1).await.unwrap();
        let result = store
            .get_or_refresh("x", || async { Some(99) })
            .await
            .unwrap();
        assert_eq!(result, RefreshResult::Fresh(1));
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_get_or_refresh_refreshes_expired() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &clock);

        store.set("x", &1).await.unwrap();
        clock.set(61);

        let result = store
            .get_or_refresh("x", || async { Some(2) })
            .await
            .unwrap();
        assert_eq!(result, RefreshResult::Refreshed(2));
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_get_or_refresh_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::new(), &ManualClock::new(0));

        let result = store
            .get_or_refresh("x", || async { Some("computed".to_string()) })
            .await
            .unwrap();
        assert!(result.is_refreshed());
        assert_eq!(store.get::<String>("x").await.unwrap().as_deref(), Some("computed"));
    }

    #[tokio::test]
    async fn test_get_or_refresh_failure_serves_stale() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &clock);

        store.set("x", &1).await.unwrap();
        clock.set(100);

        let result = store
            .get_or_refresh::<i32, _, _>("x", || async { None })
            .await
            .unwrap();
        assert_eq!(result, RefreshResult::RefreshFailed(Some(1)));

        // The stale value was re-written, restarting its window
        clock.set(159);
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_get_or_refresh_failure_without_stale() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir, StoreOptions::expiry_seconds(60), &ManualClock::new(0));

        let result = store
            .get_or_refresh::<i32, _, _>("x", || async { None })
            .await
            .unwrap();
        assert_eq!(result, RefreshResult::RefreshFailed(None));
        assert!(result.refresh_failed());
    }

    #[tokio::test]
    async fn test_fail_open_on_construction_error() {
        // No servers configured: construction fails immediately
        let config = StoreConfig::distributed(BTreeMap::new()).expiry_seconds(60);

        let err = Store::try_connect(&config).await.unwrap_err();
        assert!(matches!(err, StorError::Construction(_)));

        let store = Store::connect(&config).await;
        assert!(store.is_disabled());
        assert!(store.disabled_reason().is_some());
        assert!(store.backend_name().is_none());

        store.set("x", &1).await.unwrap();
        assert!(store.get::<i32>("x").await.unwrap().is_none());
        assert!(store.delete("x").await.unwrap());
        store.clear().await.unwrap();

        let result = store
            .get_or_refresh("x", || async { Some(1) })
            .await
            .unwrap();
        assert_eq!(result, RefreshResult::Disabled);
    }

    #[cfg(feature = "memcache")]
    #[tokio::test]
    async fn test_fail_open_on_unreachable_memcache() {
        let mut config =
            StoreConfig::distributed(BTreeMap::from([("127.0.0.1".to_string(), 1)]))
                .expiry_seconds(60);
        config.connect_timeout_secs = 1;

        let err = Store::try_connect(&config).await.unwrap_err();
        assert!(matches!(err, StorError::Construction(_)));

        let store = Store::connect(&config).await;
        assert!(store.is_disabled());
        store.set("x", &1).await.unwrap();
        assert!(store.get::<i32>("x").await.unwrap().is_none());
        assert!(store.is_expired("x").await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::file(dir.path().join("cache")).expiry_seconds(60);

        let store = Store::connect(&config).await;
        assert!(!store.is_disabled());
        assert_eq!(store.backend_name(), Some("file"));

        store.set("x", &1).await.unwrap();
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_native_ttl_backend_is_not_tracked() {
        let clock = ManualClock::new(0);
        let client = InMemoryClient::with_clock(Arc::new(clock.clone()));
        let store = Store::with_backend(
            DistributedBackend::new(Arc::new(client.clone()), true),
            StoreOptions::expiry_seconds(60),
        )
        .with_clock(Arc::new(clock.clone()));

        store.set("x", &1).await.unwrap();
        // Only the entry itself; no shadow expiry entry
        assert_eq!(client.len(), 1);

        clock.set(30);
        assert_eq!(store.get::<i32>("x").await.unwrap(), Some(1));
        assert!(!store.is_expired("x").await.unwrap());

        clock.set(61);
        assert!(store.get::<i32>("x").await.unwrap().is_none());
        assert!(store.is_expired("x").await.unwrap());

        let result = store
            .get_or_refresh("x", || async { Some(3) })
            .await
            .unwrap();
        assert_eq!(result, RefreshResult::Refreshed(3));
    }

    #[derive(Default)]
    struct CountingMetrics {
        hits: AtomicU64,
        misses: AtomicU64,
        expired: AtomicU64,
        sets: AtomicU64,
    }

    impl CacheMetrics for CountingMetrics {
        fn record_hit(&self, _key: &str, _backend: &'static str) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }

        fn record_miss(&self, _key: &str, _backend: &'static str) {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        fn record_expired(&self, _key: &str) {
            self.expired.fetch_add(1, Ordering::Relaxed);
        }

        fn record_latency(&self, operation: CacheOperation, _duration: Duration) {
            if operation == CacheOperation::Set {
                self.sets.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[tokio::test]
    async fn test_metrics_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);
        let store = Store::with_codec_and_metrics(
            Arc::new(FileBackend::new(FileConfig::new(dir.path()))),
            StoreOptions::expiry_seconds(60),
            JsonCodec::default(),
            CountingMetrics::default(),
        )
        .with_clock(Arc::new(clock.clone()));

        store.set("x", &1).await.unwrap();
        store.get::<i32>("x").await.unwrap();
        store.get::<i32>("missing").await.unwrap();
        clock.set(61);
        store.get::<i32>("x").await.unwrap();

        let metrics = store.metrics();
        assert_eq!(metrics.hits.load(Ordering::Relaxed), 1);
        // "missing" has no stamp, so it counts as expired rather than a miss
        assert_eq!(metrics.expired.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.misses.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.sets.load(Ordering::Relaxed), 1);
    }

    /// Runs the same script against a store and records what it observed
    async fn observe(store: &Store, clock: &ManualClock) -> Vec<Option<serde_json::Value>> {
        let mut seen = Vec::new();
        clock.set(0);
        store.set("a", &serde_json::json!({"n": 1})).await.unwrap();
        store.set("b", &["x", "y"]).await.unwrap();
        seen.push(store.get("a").await.unwrap());
        clock.set(30);
        store.set("b", &"replaced").await.unwrap();
        seen.push(store.get("b").await.unwrap());
        clock.set(61);
        seen.push(store.get("a").await.unwrap());
        seen.push(store.get("b").await.unwrap());
        seen.push(
            store
                .get_with("a", GetOptions::ignore_expiry())
                .await
                .unwrap(),
        );
        store.delete("b").await.unwrap();
        seen.push(
            store
                .get_with("b", GetOptions::ignore_expiry())
                .await
                .unwrap(),
        );
        store.clear().await.unwrap();
        seen.push(
            store
                .get_with("a", GetOptions::ignore_expiry())
                .await
                .unwrap(),
        );
        seen
    }

    #[cfg(feature = "sql")]
    #[tokio::test]
    async fn test_file_and_relational_are_equivalent() {
        let file_dir = tempfile::tempdir().unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(0);

        let file = file_store(&file_dir, StoreOptions::expiry_seconds(60), &clock);

        let url = format!("sqlite://{}?mode=rwc", db_dir.path().join("stor.db").display());
        let config = StoreConfig::relational(SqlConfig::from_url(url).create_table(true))
            .expiry_seconds(60);
        let relational = Store::try_connect(&config)
            .await
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        assert_eq!(relational.backend_name(), Some("relational"));

        let from_file = observe(&file, &clock).await;
        let from_sql = observe(&relational, &clock).await;

        assert_eq!(from_file, from_sql);
        assert_eq!(
            from_file,
            vec![
                Some(serde_json::json!({"n": 1})),
                Some(serde_json::json!("replaced")),
                None,
                Some(serde_json::json!("replaced")),
                Some(serde_json::json!({"n": 1})),
                None,
                None,
            ]
        );
    }

    #[cfg(feature = "sql")]
    #[tokio::test]
    async fn test_fail_open_on_invalid_table() {
        let config = StoreConfig::relational(
            SqlConfig::from_url("sqlite::memory:").table_name("no spaces allowed"),
        );
        let store = Store::connect(&config).await;
        assert!(store.is_disabled());
        assert!(store.get::<i32>("x").await.unwrap().is_none());
    }
}
