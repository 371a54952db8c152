//! stor-storage: Storage backends for stor
//!
//! - [`FileBackend`]: one file per key under a cache directory
//! - [`SqlBackend`]: a key/value table reached through sqlx (feature `sql`)
//! - [`DistributedBackend`]: a memcache or redis cluster with native TTL

pub mod config;
pub mod distributed;
pub mod file;

#[cfg(feature = "sql")]
pub mod sql;

pub use config::{DistributedConfig, DistributedProtocol, SqlConfig, SqlDriver};
pub use distributed::{DistributedBackend, DistributedClient, InMemoryClient};
pub use file::{FileBackend, FileConfig};

#[cfg(feature = "memcache")]
pub use distributed::MemcacheClient;

#[cfg(feature = "redis")]
pub use distributed::RedisClient;

#[cfg(feature = "sql")]
pub use sql::{SqlBackend, SqlDialect};
