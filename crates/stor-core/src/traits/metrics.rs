//! Metrics trait for cache observability

use std::time::Duration;

/// Cache operation for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
    Clear,
    Encode,
    Decode,
    Refresh,
}

impl CacheOperation {
    /// Get operation as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOperation::Get => "get",
            CacheOperation::Set => "set",
            CacheOperation::Delete => "delete",
            CacheOperation::Clear => "clear",
            CacheOperation::Encode => "encode",
            CacheOperation::Decode => "decode",
            CacheOperation::Refresh => "refresh",
        }
    }
}

/// Trait for cache metrics/observability
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait CacheMetrics: Send + Sync + 'static {
    /// Record a cache hit served by `backend`
    fn record_hit(&self, key: &str, backend: &'static str);

    /// Record a cache miss
    fn record_miss(&self, key: &str, backend: &'static str);

    /// Record an entry found but past its expiry
    fn record_expired(&self, key: &str);

    /// Record operation latency
    fn record_latency(&self, operation: CacheOperation, duration: Duration);
}

/// No-op metrics implementation (default)
///
/// Zero overhead when metrics are not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_hit(&self, _key: &str, _backend: &'static str) {}

    #[inline]
    fn record_miss(&self, _key: &str, _backend: &'static str) {}

    #[inline]
    fn record_expired(&self, _key: &str) {}

    #[inline]
    fn record_latency(&self, _operation: CacheOperation, _duration: Duration) {}
}

/// Metrics adapter using the `metrics` crate
///
/// Integrates with Prometheus, StatsD, and other exporters via the `metrics` ecosystem.
///
/// # Example
/// ```ignore
/// use stor_core::MetricsCrateAdapter;
///
/// let metrics = MetricsCrateAdapter::new("stor");
/// // Emits: stor_hits_total, stor_misses_total, etc.
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_hit(&self, _key: &str, backend: &'static str) {
        metrics::counter!(self.metric_name("hits_total"), "backend" => backend).increment(1);
    }

    fn record_miss(&self, _key: &str, backend: &'static str) {
        metrics::counter!(self.metric_name("misses_total"), "backend" => backend).increment(1);
    }

    fn record_expired(&self, _key: &str) {
        metrics::counter!(self.metric_name("expired_total")).increment(1);
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(
            self.metric_name("operation_duration_seconds"),
            "operation" => operation.as_str()
        )
        .record(duration.as_secs_f64());
    }
}
