//! Relational backend on a sqlx `Any` pool

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{AnyPool, Row};
use std::sync::Once;
use tracing::{debug, info};

use stor_core::{Result, StorError, StorageBackend, WriteOptions};

use super::dialect::SqlDialect;
use crate::config::SqlConfig;

static DRIVERS: Once = Once::new();

/// Relational backend
///
/// Entries live in a two-column table: `key` (primary key) and `value`
/// (UTF-8 text). Cloning creates a new handle to the SAME pool.
#[derive(Debug, Clone)]
pub struct SqlBackend {
    pool: AnyPool,
    dialect: SqlDialect,
}

impl SqlBackend {
    /// Connect to the database
    ///
    /// Fails with `Construction` if the table name is not a plain
    /// identifier, the URL scheme is unknown, or no connection can be made.
    pub async fn connect(config: &SqlConfig) -> Result<Self> {
        config.validate_table_name()?;
        let driver = config.effective_driver()?;
        DRIVERS.call_once(install_default_drivers);

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.connection_url())
            .await
            .map_err(|e| StorError::construction("connect database", e))?;

        let backend = Self {
            pool,
            dialect: SqlDialect::new(driver, &config.table_name),
        };

        if config.create_table {
            sqlx::query(&backend.dialect.create_table())
                .execute(&backend.pool)
                .await
                .map_err(|e| StorError::construction("create cache table", e))?;
        }

        info!(
            driver = driver.scheme(),
            table = %config.table_name,
            "connected relational cache backend"
        );
        Ok(backend)
    }

    /// Statement builder in use
    pub fn dialect(&self) -> &SqlDialect {
        &self.dialect
    }
}

#[async_trait]
impl StorageBackend for SqlBackend {
    fn name(&self) -> &'static str {
        "relational"
    }

    async fn put(&self, key: &str, payload: Vec<u8>, _options: &WriteOptions) -> Result<()> {
        let value = String::from_utf8(payload)
            .map_err(|e| StorError::Encoding(format!("payload is not UTF-8: {e}")))?;

        sqlx::query(&self.dialect.upsert())
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| StorError::unavailable("upsert cache row", e))?;

        debug!(key, backend = "relational", "wrote cache row");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query(&self.dialect.select())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorError::unavailable("select cache row", e))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get(0)
                    .map_err(|e| StorError::unavailable("read cache row", e))?;
                Ok(Some(value.into_bytes()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query(&self.dialect.delete())
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| StorError::unavailable("delete cache row", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<()> {
        let result = sqlx::query(&self.dialect.clear())
            .execute(&self.pool)
            .await
            .map_err(|e| StorError::unavailable("clear cache table", e))?;
        debug!(removed = result.rows_affected(), backend = "relational", "cleared cache table");
        Ok(())
    }
}
