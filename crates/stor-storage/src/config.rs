//! Connection settings for the relational and distributed backends
//!
//! These are always compiled so configuration files parse the same way
//! whichever backend features are enabled.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use stor_core::{Result, StorError};

/// SQL engine behind the relational backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDriver {
    #[default]
    Mysql,
    Postgres,
    Sqlite,
}

impl SqlDriver {
    /// URL scheme understood by the driver
    pub fn scheme(&self) -> &'static str {
        match self {
            SqlDriver::Mysql => "mysql",
            SqlDriver::Postgres => "postgres",
            SqlDriver::Sqlite => "sqlite",
        }
    }

    /// Detect the engine from a connection URL
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "mysql" | "mariadb" => Ok(SqlDriver::Mysql),
            "postgres" | "postgresql" => Ok(SqlDriver::Postgres),
            "sqlite" => Ok(SqlDriver::Sqlite),
            other => Err(StorError::Construction(format!(
                "unsupported database scheme {other:?}"
            ))),
        }
    }
}

/// Configuration for the relational backend
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Engine used when `url` is not set
    pub driver: SqlDriver,
    /// Full connection URL; overrides the individual parts below
    pub url: Option<String>,
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub dbname: String,
    /// Table holding the entries
    pub table_name: String,
    /// Pool size
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Create the table on connect if it does not exist
    pub create_table: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            driver: SqlDriver::Mysql,
            url: None,
            hostname: "localhost".to_string(),
            username: String::new(),
            password: String::new(),
            dbname: String::new(),
            table_name: "stor".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 5,
            create_table: false,
        }
    }
}

impl fmt::Debug for SqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlConfig")
            .field("driver", &self.driver)
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("dbname", &self.dbname)
            .field("table_name", &self.table_name)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("create_table", &self.create_table)
            .finish()
    }
}

impl SqlConfig {
    /// Create config from a full connection URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Set the table name
    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    /// Create the table on connect
    pub fn create_table(mut self, create: bool) -> Self {
        self.create_table = create;
        self
    }

    /// Set the pool size
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Pool acquire timeout
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Engine the connection URL points at
    pub fn effective_driver(&self) -> Result<SqlDriver> {
        match &self.url {
            Some(url) => SqlDriver::from_url(url),
            None => Ok(self.driver),
        }
    }

    /// Connection URL, assembled from the parts when `url` is not set
    ///
    /// For SQLite, `dbname` is the database file path. Credentials are
    /// percent-encoded.
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match self.driver {
            SqlDriver::Sqlite => format!("sqlite://{}?mode=rwc", self.dbname),
            driver => format!(
                "{}://{}:{}@{}/{}",
                driver.scheme(),
                urlencoding::encode(&self.username),
                urlencoding::encode(&self.password),
                self.hostname,
                self.dbname
            ),
        }
    }

    /// Check the table name is a plain SQL identifier
    pub fn validate_table_name(&self) -> Result<()> {
        let mut chars = self.table_name.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(StorError::Construction(format!(
                "invalid table name {:?}",
                self.table_name
            )));
        }
        Ok(())
    }
}

/// Wire protocol spoken by the distributed memory servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributedProtocol {
    #[default]
    Memcache,
    Redis,
}

impl DistributedProtocol {
    fn scheme(&self) -> &'static str {
        match self {
            DistributedProtocol::Memcache => "memcache",
            DistributedProtocol::Redis => "redis",
        }
    }
}

/// Configuration for the distributed memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedConfig {
    /// Cluster members, host to port; every member must be reachable
    pub servers: BTreeMap<String, u16>,
    /// Forwarded to every native `set`
    pub compression: bool,
    pub protocol: DistributedProtocol,
    /// Upper bound on connecting to the whole cluster
    pub connect_timeout: Duration,
    /// Connections per server
    pub pool_size: u32,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            servers: BTreeMap::new(),
            compression: true,
            protocol: DistributedProtocol::Memcache,
            connect_timeout: Duration::from_secs(5),
            pool_size: 10,
        }
    }
}

impl DistributedConfig {
    /// Create config for a cluster
    pub fn new(servers: BTreeMap<String, u16>) -> Self {
        Self {
            servers,
            ..Default::default()
        }
    }

    /// Add a cluster member
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.servers.insert(host.into(), port);
        self
    }

    /// Set the protocol
    pub fn protocol(mut self, protocol: DistributedProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Set the compression flag forwarded to the servers
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// One URL per server, in host order
    pub fn server_urls(&self) -> Vec<String> {
        self.servers
            .iter()
            .map(|(host, port)| format!("{}://{}:{}", self.protocol.scheme(), host, port))
            .collect()
    }
}
