//! SQLite adapter: a local default target for transfers.
//!
//! # Module Structure
//! - `connection`: pool creation and connection-string handling
//!
//! SQLite is dynamically typed, so every value is rendered to text by
//! trying the storage classes in turn. BLOBs come out base64-encoded.

mod connection;

#[cfg(test)]
mod tests;

use super::{Connection, ConnectionProvider, RowStream};
use crate::Result;
use crate::error::FlatBridgeError;
use crate::models::Row;
use crate::sql::Dialect;
use async_trait::async_trait;
use base64::Engine;
use futures::StreamExt;
use sqlx::Row as _;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use tracing::debug;

/// Name SQLite gives the primary database of a connection.
pub const MAIN_DATABASE: &str = "main";

/// Default provider backed by an `sqlx` SQLite pool.
pub struct SqliteProvider {
    pool: SqlitePool,
    connection_string: String,
}

impl std::fmt::Debug for SqliteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteProvider")
            .field("connection_string", &self.connection_string)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ConnectionProvider for SqliteProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        debug!("Acquiring SQLite connection to {}", self.connection_string);
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(FlatBridgeError::connection_failed)?;
        Ok(Box::new(SqliteSession { conn }))
    }

    fn default_database(&self) -> String {
        MAIN_DATABASE.to_string()
    }

    fn describe(&self) -> String {
        self.connection_string.clone()
    }
}

/// One pooled SQLite connection, returned to the pool on drop.
struct SqliteSession {
    conn: PoolConnection<Sqlite>,
}

#[async_trait]
impl Connection for SqliteSession {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        let rows = sqlx::query(sql)
            .persistent(false)
            .fetch(&mut *self.conn)
            .map(|row| row.map(|r| row_to_text(&r)).map_err(map_sqlx_error));
        Ok(rows.boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .persistent(false)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Statement errors are query errors; anything else means the connection
/// itself is gone.
fn map_sqlx_error(error: sqlx::Error) -> FlatBridgeError {
    match error {
        sqlx::Error::Database(db) => FlatBridgeError::query_failed(db.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
            FlatBridgeError::query_failed(error.to_string())
        }
        other => FlatBridgeError::connection_failed(other),
    }
}

fn row_to_text(row: &SqliteRow) -> Row {
    (0..row.len())
        .map(|index| extract_column_text(row, index))
        .collect()
}

/// Renders one column value as text; `None` for NULL.
fn extract_column_text(row: &SqliteRow, index: usize) -> Option<String> {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v;
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(|n| n.to_string());
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes));
    }
    None
}
