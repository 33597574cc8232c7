//! Database connection module for the HealthSure application
//!
//! SQLite is reached through an r2d2 pool. Every pooled connection has foreign keys enabled
//! so that deleting a user cascades to the user's health record sections.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, error, info};

use super::migrations::run_sqlite_migrations;
use super::DatabaseError;
use crate::repository::RepositoryError;

/// Default location of the SQLite database file
pub const DEFAULT_SQLITE_PATH: &str = "data/health_sure.db";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file. `None` selects a private in-memory database.
    pub sqlite_path: Option<String>,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection checkout timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: Some(DEFAULT_SQLITE_PATH.to_string()),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let sqlite_path = match env::var("DB_SQLITE_PATH") {
            Ok(path) if path == ":memory:" => None,
            Ok(path) => Some(path),
            Err(_) => {
                info!("No DB_SQLITE_PATH provided, using default path: {}", DEFAULT_SQLITE_PATH);
                Some(DEFAULT_SQLITE_PATH.to_string())
            }
        };

        let max_connections = parse_env("DB_MAX_CONNECTIONS", 10u32)?;
        let timeout_seconds = parse_env("DB_TIMEOUT_SECONDS", 30u64)?;

        info!(
            "Database configuration: path={}, max_connections={}, timeout={}s",
            sqlite_path.as_deref().unwrap_or(":memory:"),
            max_connections,
            timeout_seconds
        );

        Ok(Self {
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: None,
            max_connections: 1,
            timeout_seconds: 5,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, DatabaseError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| DatabaseError::InvalidEnvVar(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Shared handle to the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: Arc<r2d2::Pool<SqliteConnectionManager>>,
}

impl DatabasePool {
    /// Open the pool described by `config` and bring the schema up to date
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let (manager, max_size) = match config.sqlite_path.as_deref() {
            Some(path) => {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        info!("Creating database directory: {:?}", parent);
                        std::fs::create_dir_all(parent)?;
                    }
                }
                info!("Initializing SQLite database at: {}", path);
                let manager = SqliteConnectionManager::file(path)
                    .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE);
                (manager, config.max_connections.max(1))
            }
            None => {
                // Each in-memory connection is its own database, so the pool holds exactly one.
                info!("Initializing in-memory SQLite database");
                (SqliteConnectionManager::memory(), 1)
            }
        };

        let manager = manager.with_init(|conn| {
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

        let pool = r2d2::Pool::builder()
            .max_size(max_size)
            .connection_timeout(Duration::from_secs(config.timeout_seconds))
            .build(manager)
            .map_err(|e| {
                error!("Failed to create SQLite connection pool: {}", e);
                DatabaseError::SqlitePoolError(e)
            })?;

        {
            let conn = pool.get()?;
            run_sqlite_migrations(&conn).map_err(DatabaseError::MigrationError)?;
        }

        info!("SQLite connection pool created successfully");
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Open a fresh in-memory database with the full schema
    pub fn in_memory() -> Result<Self, DatabaseError> {
        Self::connect(&DatabaseConfig::in_memory())
    }

    /// Run blocking database work on a pooled connection
    pub async fn run<F, T>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut Connection) -> Result<T, RepositoryError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            work(&mut conn)
        })
        .await
        .map_err(|e| RepositoryError::Task(e.to_string()))?
    }

    /// Execute a trivial query to prove the database answers
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    /// Describe the backing database and the pool state
    pub fn connection_info(&self) -> String {
        let location = match self.pool.get() {
            Ok(conn) => conn
                .query_row("PRAGMA database_list", [], |row| row.get::<_, String>(2))
                .map(|path| {
                    if path.is_empty() || path == ":memory:" {
                        "SQLite in-memory database".to_string()
                    } else {
                        format!("SQLite database at {}", path)
                    }
                })
                .unwrap_or_else(|_| "SQLite database (path unknown)".to_string()),
            Err(e) => {
                error!("Failed to get SQLite connection: {}", e);
                return format!("SQLite connection error: {}", e);
            }
        };

        let state = self.pool.state();
        debug!("Pool state: {:?}", state);
        format!(
            "{} (connections: active={}, idle={})",
            location, state.connections, state.idle_connections
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_database_config_default() {
        let config = DatabaseConfig::default();
        assert_eq!(config.sqlite_path.as_deref(), Some(DEFAULT_SQLITE_PATH));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[tokio::test]
    async fn test_in_memory_pool_is_migrated() {
        let pool = DatabasePool::in_memory().unwrap();
        pool.ping().await.unwrap();

        let tables: Vec<String> = pool
            .run(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();

        for table in [
            "users",
            "basic_info",
            "health_status",
            "medical_history",
            "treatment_info",
            "lab_results",
            "notes",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = DatabasePool::in_memory().unwrap();
        let enabled = pool
            .run(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get::<_, i64>(0))?))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_connection_info_reports_memory() {
        let pool = DatabasePool::in_memory().unwrap();
        assert!(pool.connection_info().contains("in-memory"));
    }
}
