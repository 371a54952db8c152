//! Core traits for cache operations

mod backend;
mod codec;
mod key;
mod metrics;
mod tracing_metrics;

pub use backend::StorageBackend;
pub use codec::{Codec, DecodeShape, JsonCodec};
pub use key::{CacheKey, STOR_PREFIX, expiry_key, page_key};
pub use metrics::{CacheMetrics, CacheOperation, NoopMetrics};
pub use tracing_metrics::TracingMetrics;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;
