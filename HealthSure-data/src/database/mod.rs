use thiserror::Error;

// Database modules
pub mod connection;
pub mod migrations;

// Re-export database connection types
pub use connection::*;

/// Database error enum
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Environment variable could not be parsed
    #[error("Invalid value for environment variable {0}")]
    InvalidEnvVar(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// SQLite connection pool error
    #[error("SQLite connection pool error: {0}")]
    SqlitePoolError(#[from] r2d2::Error),

    /// Filesystem error while preparing the database location
    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("Database migration error: {0}")]
    MigrationError(String),
}
