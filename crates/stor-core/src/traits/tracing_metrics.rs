use crate::{CacheMetrics, CacheOperation};
use std::time::Duration;
use tracing::debug;

/// Metrics adapter that logs events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_hit(&self, key: &str, backend: &'static str) {
        debug!(
            target: "stor",
            event = "hit",
            key = %key,
            backend = backend,
            service = ?self.service_name,
            "Cache Hit"
        );
    }

    fn record_miss(&self, key: &str, backend: &'static str) {
        debug!(
            target: "stor",
            event = "miss",
            key = %key,
            backend = backend,
            service = ?self.service_name,
            "Cache Miss"
        );
    }

    fn record_expired(&self, key: &str) {
        debug!(
            target: "stor",
            event = "expired",
            key = %key,
            service = ?self.service_name,
            "Cache Entry Expired"
        );
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        tracing::trace!(
            target: "stor",
            event = "latency",
            operation = operation.as_str(),
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Cache Operation Latency"
        );
    }
}
