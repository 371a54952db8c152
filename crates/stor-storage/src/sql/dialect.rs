//! Per-engine SQL text

use crate::config::SqlDriver;

/// Statement builder for one SQL engine
///
/// Identifiers are always quoted because `key` is reserved in MySQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlDialect {
    driver: SqlDriver,
    table: String,
}

impl SqlDialect {
    /// Create statements for `table` on `driver`
    ///
    /// `table` must already be a validated identifier.
    pub fn new(driver: SqlDriver, table: &str) -> Self {
        Self {
            driver,
            table: table.to_string(),
        }
    }

    /// Engine the statements target
    pub fn driver(&self) -> SqlDriver {
        self.driver
    }

    fn quote(&self, ident: &str) -> String {
        match self.driver {
            SqlDriver::Mysql => format!("`{ident}`"),
            SqlDriver::Postgres | SqlDriver::Sqlite => format!("\"{ident}\""),
        }
    }

    fn placeholder(&self, n: usize) -> String {
        match self.driver {
            SqlDriver::Postgres => format!("${n}"),
            SqlDriver::Mysql | SqlDriver::Sqlite => "?".to_string(),
        }
    }

    pub fn create_table(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR(255) PRIMARY KEY, {} TEXT NOT NULL)",
            self.quote(&self.table),
            self.quote("key"),
            self.quote("value"),
        )
    }

    pub fn upsert(&self) -> String {
        let (table, key, value) = (self.quote(&self.table), self.quote("key"), self.quote("value"));
        let insert = format!(
            "INSERT INTO {table} ({key}, {value}) VALUES ({}, {})",
            self.placeholder(1),
            self.placeholder(2),
        );
        match self.driver {
            SqlDriver::Mysql => {
                format!("{insert} ON DUPLICATE KEY UPDATE {value} = VALUES({value})")
            }
            SqlDriver::Postgres => {
                format!("{insert} ON CONFLICT ({key}) DO UPDATE SET {value} = EXCLUDED.{value}")
            }
            SqlDriver::Sqlite => {
                format!("{insert} ON CONFLICT({key}) DO UPDATE SET {value} = excluded.{value}")
            }
        }
    }

    pub fn select(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.quote("value"),
            self.quote(&self.table),
            self.quote("key"),
            self.placeholder(1),
        )
    }

    pub fn delete(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote(&self.table),
            self.quote("key"),
            self.placeholder(1),
        )
    }

    pub fn clear(&self) -> String {
        format!("DELETE FROM {}", self.quote(&self.table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_statements() {
        let d = SqlDialect::new(SqlDriver::Mysql, "stor");
        assert_eq!(
            d.upsert(),
            "INSERT INTO `stor` (`key`, `value`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `value` = VALUES(`value`)"
        );
        assert_eq!(d.select(), "SELECT `value` FROM `stor` WHERE `key` = ?");
    }

    #[test]
    fn test_postgres_statements() {
        let d = SqlDialect::new(SqlDriver::Postgres, "stor");
        assert_eq!(
            d.upsert(),
            "INSERT INTO \"stor\" (\"key\", \"value\") VALUES ($1, $2) ON CONFLICT (\"key\") DO UPDATE SET \"value\" = EXCLUDED.\"value\""
        );
        assert_eq!(d.delete(), "DELETE FROM \"stor\" WHERE \"key\" = $1");
    }

    #[test]
    fn test_sqlite_create_and_clear() {
        let d = SqlDialect::new(SqlDriver::Sqlite, "cache_entries");
        assert_eq!(
            d.create_table(),
            "CREATE TABLE IF NOT EXISTS \"cache_entries\" (\"key\" VARCHAR(255) PRIMARY KEY, \"value\" TEXT NOT NULL)"
        );
        assert_eq!(d.clear(), "DELETE FROM \"cache_entries\"");
    }
}
