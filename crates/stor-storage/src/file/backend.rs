//! Filesystem backend
//!
//! Every key maps to a file directly under the cache directory. Writes go
//! through a hidden work directory: the payload is staged in a temp file and
//! renamed over the key's file while holding an exclusive lock on a per-key
//! lock file, so readers only ever observe whole payloads.

use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::debug;

use stor_core::{Result, StorError, StorageBackend, WriteOptions};

use super::config::FileConfig;

/// Name of the hidden directory holding lock and staging files
const WORK_DIR: &str = ".stor";

/// Filesystem backend
///
/// Cloning creates a new handle to the SAME directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    inner: Arc<Paths>,
}

#[derive(Debug)]
struct Paths {
    root: PathBuf,
    work: PathBuf,
    permissions: u32,
}

impl FileBackend {
    /// Create a backend rooted at `config.cache_dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(config: FileConfig) -> Self {
        let work = config.cache_dir.join(WORK_DIR);
        Self {
            inner: Arc::new(Paths {
                root: config.cache_dir,
                work,
                permissions: config.permissions,
            }),
        }
    }

    /// Directory holding the cache files
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Run blocking filesystem work off the async executor
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Paths) -> Result<T> + Send + 'static,
    {
        let paths = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&paths))
            .await
            .map_err(|e| StorError::unavailable("file task", e))?
    }
}

impl Paths {
    fn file_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn ensure_dirs(&self) -> Result<()> {
        let fresh = !self.root.exists();
        fs::create_dir_all(&self.work)
            .map_err(|e| StorError::unavailable("create cache directory", e))?;
        if fresh {
            apply_permissions(&self.root, self.permissions)
                .map_err(|e| StorError::unavailable("set cache directory permissions", e))?;
        }
        Ok(())
    }

    /// Open and exclusively lock the lock file for `key`
    ///
    /// The lock is released when the returned handle is dropped.
    fn lock(&self, key: &str) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.work.join(format!("{key}.lock")))
            .map_err(|e| StorError::unavailable("open lock file", e))?;
        file.lock()
            .map_err(|e| StorError::unavailable("lock cache file", e))?;
        Ok(file)
    }

    fn write(&self, key: &str, payload: &[u8]) -> Result<()> {
        self.ensure_dirs()?;
        let _guard = self.lock(key)?;

        let mut staged = NamedTempFile::new_in(&self.work)
            .map_err(|e| StorError::unavailable("create staging file", e))?;
        staged
            .write_all(payload)
            .and_then(|()| staged.as_file().sync_data())
            .map_err(|e| StorError::unavailable("write cache file", e))?;
        apply_permissions(staged.path(), self.permissions)
            .map_err(|e| StorError::unavailable("set cache file permissions", e))?;
        staged
            .persist(self.file_path(key))
            .map_err(|e| StorError::unavailable("write cache file", e.error))?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.file_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorError::unavailable("read cache file", e)),
        }
    }

    fn remove(&self, key: &str) -> Result<bool> {
        // Nothing was ever written through this backend
        let _guard = if self.work.is_dir() {
            Some(self.lock(key)?)
        } else {
            None
        };

        match fs::remove_file(self.file_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorError::unavailable("delete cache file", e)),
        }
    }

    fn remove_all(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StorError::unavailable("list cache directory", e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StorError::unavailable("list cache directory", e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| StorError::unavailable("list cache directory", e))?
                .is_dir();
            if is_dir {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorError::unavailable("delete cache file", e)),
            }
        }
        self.prune_locks()?;
        Ok(removed)
    }

    /// Remove lock files nobody currently holds
    ///
    /// A writer that opened a lock file just before it is unlinked still
    /// locks the old inode; its rename is atomic either way.
    fn prune_locks(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.work) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorError::unavailable("list work directory", e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| StorError::unavailable("list work directory", e))?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "lock") {
                continue;
            }
            let Ok(file) = OpenOptions::new().write(true).open(&path) else {
                continue;
            };
            if file.try_lock().is_ok() {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(StorError::unavailable("delete lock file", e)),
                }
            }
        }
        Ok(())
    }
}

/// Reject keys that are not a single plain file name
fn validate_key(key: &str) -> Result<()> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key == WORK_DIR
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorError::InvalidKey(format!(
            "{key:?} is not a valid cache file name"
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn put(&self, key: &str, payload: Vec<u8>, _options: &WriteOptions) -> Result<()> {
        validate_key(key)?;
        let owned = key.to_string();
        self.blocking(move |paths| paths.write(&owned, &payload))
            .await?;
        debug!(key, backend = "file", "wrote cache file");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let owned = key.to_string();
        self.blocking(move |paths| paths.read(&owned)).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let owned = key.to_string();
        self.blocking(move |paths| paths.remove(&owned)).await
    }

    async fn clear(&self) -> Result<()> {
        let removed = self.blocking(|paths| paths.remove_all()).await?;
        debug!(removed, backend = "file", "cleared cache directory");
        Ok(())
    }
}
