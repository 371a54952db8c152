//! Store configuration and layered loading

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stor_core::{DecodeShape, Result, StorError};
use stor_storage::{DistributedConfig, DistributedProtocol, FileConfig, SqlConfig};

/// Prefix of environment overrides, e.g. `STOR__EXPIRY_SECONDS=60`
pub const ENV_PREFIX: &str = "STOR";

/// Which backend a store is built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    #[default]
    File,
    Relational,
    DistributedMemory,
}

/// Configuration for a [`Store`](crate::Store)
///
/// Immutable once the store is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub storage_type: StorageType,

    /// File backend root
    pub cache_dir: PathBuf,
    /// File backend mode bits
    pub permissions: u32,

    /// Relational backend settings
    pub db: SqlConfig,

    /// Distributed memory cluster, host to port
    pub memcache_servers: BTreeMap<String, u16>,
    pub memcache_compression: bool,
    pub distributed_protocol: DistributedProtocol,
    /// Seconds allowed for connecting to the cluster
    pub connect_timeout_secs: u64,

    /// Entry lifetime; `None` keeps entries forever
    pub expiry_seconds: Option<u64>,
    /// Decode objects as ordered mappings rather than records
    pub decode_as_mapping: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::File,
            cache_dir: PathBuf::from("cache"),
            permissions: 0o764,
            db: SqlConfig::default(),
            memcache_servers: BTreeMap::new(),
            memcache_compression: true,
            distributed_protocol: DistributedProtocol::Memcache,
            connect_timeout_secs: 5,
            expiry_seconds: None,
            decode_as_mapping: true,
        }
    }
}

impl StoreConfig {
    /// File store rooted at `cache_dir`
    pub fn file(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_type: StorageType::File,
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    /// Relational store
    pub fn relational(db: SqlConfig) -> Self {
        Self {
            storage_type: StorageType::Relational,
            db,
            ..Default::default()
        }
    }

    /// Distributed memory store
    pub fn distributed(servers: BTreeMap<String, u16>) -> Self {
        Self {
            storage_type: StorageType::DistributedMemory,
            memcache_servers: servers,
            ..Default::default()
        }
    }

    /// Set the entry lifetime
    pub fn expiry_seconds(mut self, seconds: u64) -> Self {
        self.expiry_seconds = Some(seconds);
        self
    }

    /// Choose how dynamic decodes shape objects
    pub fn decode_as_mapping(mut self, as_mapping: bool) -> Self {
        self.decode_as_mapping = as_mapping;
        self
    }

    /// Load from an optional file, then `STOR__*` environment overrides
    ///
    /// Nested keys use `__`, e.g. `STOR__DB__TABLE_NAME=cache`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Parse a TOML document
    pub fn from_toml(source: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .map_err(config_error)?
            .try_deserialize::<Self>()
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = builder
            .build()
            .map_err(config_error)?
            .try_deserialize::<Self>()
            .map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no backend could work with
    pub fn validate(&self) -> Result<()> {
        if self.permissions > 0o7777 {
            return Err(StorError::Config(format!(
                "permissions {:o} are not valid mode bits",
                self.permissions
            )));
        }
        if self.storage_type == StorageType::Relational && self.db.table_name.is_empty() {
            return Err(StorError::Config("db.table_name must not be empty".to_string()));
        }
        Ok(())
    }

    /// Settings for the file backend
    pub fn file_config(&self) -> FileConfig {
        FileConfig::new(self.cache_dir.clone()).permissions(self.permissions)
    }

    /// Settings for the distributed memory backend
    pub fn distributed_config(&self) -> DistributedConfig {
        DistributedConfig::new(self.memcache_servers.clone())
            .protocol(self.distributed_protocol)
            .compression(self.memcache_compression)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    /// Object shape for dynamic decodes
    pub fn decode_shape(&self) -> DecodeShape {
        DecodeShape::from_mapping_flag(self.decode_as_mapping)
    }
}

fn config_error(err: config::ConfigError) -> StorError {
    StorError::Config(err.to_string())
}
