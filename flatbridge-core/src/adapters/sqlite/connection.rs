//! SQLite pool creation.
//!
//! # Connection Modes
//! - File-based: `sqlite:///path/to/database.db` or a bare `*.db` path;
//!   the file is created when missing so it can receive imports.
//! - In-memory: `sqlite::memory:`; the pool keeps its single connection
//!   alive so the database survives between operations.

use super::SqliteProvider;
use crate::Result;
use crate::error::FlatBridgeError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

impl SqliteProvider {
    /// Opens a provider for a SQLite connection string or file path.
    ///
    /// # Errors
    /// Returns a configuration error for an unparseable connection string
    /// and a connection error when the database cannot be opened.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let normalized = normalize_connection_string(connection_string);

        let options = SqliteConnectOptions::from_str(&normalized)
            .map_err(|e| {
                FlatBridgeError::configuration(format!("Invalid SQLite connection string: {}", e))
            })?
            .create_if_missing(true);

        // Single writer; one connection also keeps an in-memory database alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(FlatBridgeError::connection_failed)?;

        Ok(Self {
            pool,
            connection_string: normalized,
        })
    }

    /// Closes the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Normalizes a connection string to SQLite URL format.
pub(crate) fn normalize_connection_string(connection_string: &str) -> String {
    if connection_string == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    if connection_string.starts_with("sqlite:") {
        return connection_string.to_string();
    }

    format!("sqlite://{}", connection_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_connection_string() {
        assert_eq!(normalize_connection_string(":memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_connection_string("sqlite:///path/db.sqlite"),
            "sqlite:///path/db.sqlite"
        );
        assert_eq!(
            normalize_connection_string("/path/to/db.sqlite"),
            "sqlite:///path/to/db.sqlite"
        );
    }

    #[tokio::test]
    async fn test_connect_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        assert!(!path.exists());

        let provider = SqliteProvider::connect(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());
        provider.close().await;
    }
}
