//! Per-operation options

use std::time::Duration;

/// Options passed to a backend write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Native time-to-live, honored only by backends with native TTL
    pub ttl: Option<Duration>,
}

impl WriteOptions {
    /// Write without native TTL
    pub fn new() -> Self {
        Self::default()
    }

    /// Write with a native TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    /// Write with a native TTL in seconds
    pub fn ttl_secs(seconds: u64) -> Self {
        Self::with_ttl(Duration::from_secs(seconds))
    }
}

impl From<Duration> for WriteOptions {
    fn from(ttl: Duration) -> Self {
        Self::with_ttl(ttl)
    }
}

/// Options for a store read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Return the entry even when its expiry has passed
    pub ignore_expiry: bool,
}

impl GetOptions {
    /// Read honoring expiry
    pub fn new() -> Self {
        Self::default()
    }

    /// Read regardless of expiry
    pub fn ignore_expiry() -> Self {
        Self {
            ignore_expiry: true,
        }
    }
}
