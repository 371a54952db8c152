//! Distributed memory backend
//!
//! The backend talks to the cluster through [`DistributedClient`], so the
//! cache logic never depends on a concrete wire client.

mod backend;
mod client;
mod memory;

#[cfg(feature = "memcache")]
mod memcache;

#[cfg(feature = "redis")]
mod redis;

pub use backend::DistributedBackend;
pub use client::DistributedClient;
pub use memory::InMemoryClient;

#[cfg(feature = "memcache")]
pub use self::memcache::MemcacheClient;

#[cfg(feature = "redis")]
pub use self::redis::RedisClient;
