//! Error types for cache operations

use thiserror::Error;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorError {
    /// Backend could not be constructed (bad credentials, unreachable servers)
    #[error("construction error: {0}")]
    Construction(String),

    /// Backend failed after construction (I/O, permissions, failed statement)
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Value could not be encoded or decoded
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Key cannot be represented by the backend
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl StorError {
    /// Wrap an I/O-level failure into `BackendUnavailable`
    pub fn unavailable(context: &str, err: impl std::fmt::Display) -> Self {
        StorError::BackendUnavailable(format!("{context}: {err}"))
    }

    /// Wrap a connection failure into `Construction`
    pub fn construction(context: &str, err: impl std::fmt::Display) -> Self {
        StorError::Construction(format!("{context}: {err}"))
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, StorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorError::InvalidKey("a/b".to_string());
        assert_eq!(err.to_string(), "invalid key: a/b");

        let err = StorError::Encoding("trailing characters".to_string());
        assert_eq!(err.to_string(), "encoding error: trailing characters");

        let err = StorError::unavailable("write cache file", "permission denied");
        assert_eq!(
            err.to_string(),
            "backend unavailable: write cache file: permission denied"
        );
    }

    #[test]
    fn test_construction_helper() {
        let err = StorError::construction("connect memcache", "refused");
        assert!(matches!(err, StorError::Construction(ref m) if m == "connect memcache: refused"));
    }
}
