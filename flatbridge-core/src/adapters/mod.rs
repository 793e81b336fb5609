//! Database connection traits and the default-provider factory.
//!
//! The engines never talk to a driver directly. They ask a
//! [`ConnectionProvider`] for a [`Connection`], use it for exactly one
//! operation and drop it. Two kinds of provider exist:
//! - a default provider built once from the configured connection URL
//!   (pooled), and
//! - a dynamic provider built from a caller-supplied [`ConnectionConfig`]
//!   that opens a fresh connection on every acquire.
//!
//! # Module Structure
//! - `config`: `ConnectionConfig`
//! - `clickhouse`: ClickHouse over its HTTP interface (feature `clickhouse`)
//! - `sqlite`: local SQLite databases through sqlx (feature `sqlite`)

use crate::Result;
use crate::models::Row;
use crate::sql::Dialect;
use async_trait::async_trait;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;

pub mod config;

pub use config::ConnectionConfig;

#[cfg(feature = "clickhouse")]
pub mod clickhouse;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
pub(crate) mod mock;

/// Stream of result rows read from an open cursor.
pub type RowStream<'a> = BoxStream<'a, Result<Row>>;

/// A live database connection, used for one operation and then dropped.
///
/// # Object Safety
/// This trait is object-safe; providers hand out `Box<dyn Connection>`.
#[async_trait]
pub trait Connection: Send {
    /// SQL dialect spoken by this connection.
    fn dialect(&self) -> Dialect;

    /// Runs a query and streams its rows as text.
    ///
    /// Rows are produced as the server sends them; nothing is buffered
    /// beyond the current network chunk.
    ///
    /// # Errors
    /// Returns a query error when the statement is rejected. Errors while
    /// reading later rows surface as items of the stream.
    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>>;

    /// Executes a statement that returns no rows.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Reads the server product version.
    async fn server_version(&mut self) -> Result<String> {
        let sql = self.dialect().version_query();
        let mut rows = self.query(sql).await?;
        match rows.try_next().await? {
            Some(row) => Ok(row.into_iter().next().flatten().unwrap_or_default()),
            None => Err(crate::error::FlatBridgeError::query_failed(
                "Version query returned no rows",
            )),
        }
    }
}

/// Capability of producing live connections.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Returns a live connection.
    ///
    /// # Errors
    /// Returns a connection error carrying the driver's cause text when the
    /// server is unreachable or rejects the credentials.
    async fn acquire(&self) -> Result<Box<dyn Connection>>;

    /// Database that schema listings default to.
    fn default_database(&self) -> String;

    /// Credential-free description of the target, for logs.
    fn describe(&self) -> String;
}

/// Shared handle to a provider; cloned once per operation.
pub type SharedProvider = Arc<dyn ConnectionProvider>;

/// Backends a default connection URL can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// ClickHouse HTTP interface
    ClickHouse,
    /// Local SQLite file
    Sqlite,
}

/// Creates the default (pooled) provider for a connection URL.
///
/// # Arguments
/// * `connection_url` - `clickhouse://`, `http(s)://` or `sqlite:` URL, or
///   a path ending in `.db`/`.sqlite`/`.sqlite3`
///
/// # Errors
/// Returns error if:
/// - The URL format is not recognized
/// - The backend is not compiled in
/// - The pool cannot be created
pub async fn create_default_provider(connection_url: &str) -> Result<SharedProvider> {
    match detect_backend(connection_url)? {
        #[cfg(feature = "clickhouse")]
        Backend::ClickHouse => {
            let config = crate::security::parse_connection_url(connection_url)?;
            Ok(Arc::new(clickhouse::ClickHousePool::new(config)?))
        }
        #[cfg(not(feature = "clickhouse"))]
        Backend::ClickHouse => Err(crate::error::FlatBridgeError::configuration(
            "ClickHouse support not compiled in. Use --features clickhouse",
        )),
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Arc::new(
            sqlite::SqliteProvider::connect(connection_url).await?,
        )),
        #[cfg(not(feature = "sqlite"))]
        Backend::Sqlite => Err(crate::error::FlatBridgeError::configuration(
            "SQLite support not compiled in. Use --features sqlite",
        )),
    }
}

/// Creates the provider for a dynamically supplied configuration.
///
/// # Errors
/// Returns a configuration error if the config is invalid.
pub fn create_dynamic_provider(config: ConnectionConfig) -> Result<SharedProvider> {
    config.validate()?;

    #[cfg(feature = "clickhouse")]
    {
        Ok(Arc::new(clickhouse::DynamicClickHouse::new(config)?))
    }
    #[cfg(not(feature = "clickhouse"))]
    {
        let _ = config;
        Err(crate::error::FlatBridgeError::configuration(
            "ClickHouse support not compiled in. Use --features clickhouse",
        ))
    }
}

/// Detects the backend from a connection URL.
///
/// # Errors
/// Returns error if the URL format is unrecognized
pub fn detect_backend(connection_url: &str) -> Result<Backend> {
    if connection_url.starts_with("clickhouse://")
        || connection_url.starts_with("http://")
        || connection_url.starts_with("https://")
    {
        Ok(Backend::ClickHouse)
    } else if connection_url.starts_with("sqlite:")
        || connection_url.ends_with(".db")
        || connection_url.ends_with(".sqlite")
        || connection_url.ends_with(".sqlite3")
    {
        Ok(Backend::Sqlite)
    } else {
        Err(crate::error::FlatBridgeError::configuration(
            "Unrecognized database connection string format",
        ))
    }
}
