//! stor: pluggable key/value cache
//!
//! # Features
//!
//! - **Interchangeable backends**: a directory of files, a relational table,
//!   or a memcache/redis cluster
//! - **Expiry** on every backend, through shadow timestamp entries where the
//!   backend has no native TTL
//! - **Fail-open construction**: an unreachable backend disables caching
//!   instead of failing the application
//! - **Whole-page caching** with deferred write-back
//! - **Metrics integration**
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use stor::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::connect(&StoreConfig::file("cache").expiry_seconds(60)).await;
//!
//!     store.set("foo", &["baz", "bat", "bar"]).await?;
//!
//!     match store.get::<Vec<String>>("foo").await? {
//!         Some(value) => println!("Got: {value:?}"),
//!         None => println!("Cache miss"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod page;
pub mod store;

// Re-export core
pub use stor_core::*;

// Re-export storage
pub use stor_storage::{
    DistributedBackend, DistributedClient, DistributedConfig, DistributedProtocol, FileBackend,
    FileConfig, InMemoryClient, SqlConfig, SqlDriver,
};

#[cfg(feature = "sql")]
pub use stor_storage::SqlBackend;

#[cfg(feature = "memcache")]
pub use stor_storage::MemcacheClient;

#[cfg(feature = "redis")]
pub use stor_storage::RedisClient;

pub use page::{PageCache, PageCapture, PageOutcome};
pub use store::{ExpiryTracker, StorageType, Store, StoreConfig, StoreOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CacheKey, Codec, GetOptions, JsonCodec, PageCache, PageOutcome, RefreshResult, Result,
        StorError, Store, StoreConfig, StoreOptions,
    };

    pub use crate::{FileBackend, FileConfig};

    #[cfg(feature = "sql")]
    pub use crate::{SqlBackend, SqlConfig};
}

#[cfg(test)]
mod tests;
