//! Cache key trait and derived keys

use std::fmt::Display;

/// Prefix shared by every key the store derives on its own
pub const STOR_PREFIX: &str = "_stor_";

/// Shadow key holding the last-write timestamp of `key`
pub fn expiry_key(key: &str) -> String {
    format!("{STOR_PREFIX}_expiry_{key}")
}

/// Key under which the page served for `request_uri` is cached
///
/// Slashes become dashes so the key is a valid file name.
pub fn page_key(request_uri: &str) -> String {
    format!("{STOR_PREFIX}_page_{}", request_uri.replace('/', "-"))
}

/// Trait for types that can be used as cache keys
///
/// Implement this trait to use custom types as cache keys.
pub trait CacheKey: Send + Sync {
    /// Generate the key string
    fn cache_key(&self) -> String;
}

impl CacheKey for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

impl CacheKey for &str {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl CacheKey for &String {
    fn cache_key(&self) -> String {
        (*self).clone()
    }
}

// Tuple implementations for composite keys

impl<T1: Display + Send + Sync, T2: Display + Send + Sync> CacheKey for (T1, T2) {
    fn cache_key(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

impl<T1: Display + Send + Sync, T2: Display + Send + Sync, T3: Display + Send + Sync> CacheKey
    for (T1, T2, T3)
{
    fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.0, self.1, self.2)
    }
}
