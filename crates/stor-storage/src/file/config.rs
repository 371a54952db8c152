//! Configuration for the file backend

use std::path::PathBuf;

/// Configuration for the file backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConfig {
    /// Directory holding one file per key
    pub cache_dir: PathBuf,

    /// Mode bits applied to the directory and every cache file (unix only)
    pub permissions: u32,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            permissions: 0o764,
        }
    }
}

impl FileConfig {
    /// Create config rooted at `cache_dir`
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Set the mode bits for the directory and files
    pub fn permissions(mut self, mode: u32) -> Self {
        self.permissions = mode;
        self
    }
}
