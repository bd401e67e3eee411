//! SeaORM storage backend
//!
//! One `SeaOrmStorage` serves every component: RBAC joins, the analytics
//! event log, audit log, blocklist and the content ownership lookups.
//! SQLite, MySQL/MariaDB and PostgreSQL are supported.

mod analytics;
mod audit;
mod blacklist;
mod connection;
mod content;
mod rbac;
mod retry;
mod users;

use sea_orm::{DatabaseConnection, DbBackend};
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{BiolinkerError, Result};

pub use analytics::{
    DeviceRow, GeoRow, LOCAL_CITY, NewEvent, ReferrerRow, TimelineRow, TotalsRow,
    UNKNOWN_GEO_SENTINELS,
};
pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use rbac::{RoleRow, SaveRoleRecord};
pub use users::{ACTIVE_STATUS, NewUser};

/// Infer the database kind from its URL
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(BiolinkerError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// Turn a bare SQLite path into a URL sqlx accepts
fn normalize_sqlite_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite://{}", database_url)
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    write_retry: retry::WriteRetry,
}

impl SeaOrmStorage {
    /// Connect and run pending migrations.
    pub async fn new(database_url: &str, config: &DatabaseConfig) -> Result<Self> {
        if database_url.is_empty() {
            return Err(BiolinkerError::database_config("database_url is not set"));
        }

        let backend_name = infer_backend_from_url(database_url)?;
        let write_retry = retry::WriteRetry::from_config(config);

        let db = if backend_name == "sqlite" {
            connect_sqlite(&normalize_sqlite_url(database_url)).await?
        } else {
            connect_generic(database_url, &backend_name, config).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            write_retry,
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    fn db_backend(&self) -> DbBackend {
        match self.backend_name.as_str() {
            "mysql" => DbBackend::MySql,
            "postgres" => DbBackend::Postgres,
            _ => DbBackend::Sqlite,
        }
    }

    /// Liveness probe for the health endpoint
    pub async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_backend() {
        assert_eq!(infer_backend_from_url("sqlite://a.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("data/biolinker.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("mariadb://u@h/db").unwrap(), "mysql");
        assert_eq!(
            infer_backend_from_url("postgresql://u@h/db").unwrap(),
            "postgres"
        );
        assert!(infer_backend_from_url("redis://localhost").is_err());
    }

    #[test]
    fn bare_paths_become_urls() {
        assert_eq!(normalize_sqlite_url("a.db"), "sqlite://a.db");
        assert_eq!(normalize_sqlite_url("sqlite://a.db?mode=rwc"), "sqlite://a.db?mode=rwc");
    }
}
