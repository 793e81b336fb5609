//! Unit tests for the SQLite adapter against scratch database files.

use super::{MAIN_DATABASE, SqliteProvider};
use crate::adapters::ConnectionProvider;
use crate::error::FlatBridgeError;
use crate::models::Row;
use crate::sql::Dialect;
use futures::TryStreamExt;
use tempfile::TempDir;

async fn scratch_provider() -> (TempDir, SqliteProvider) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("scratch.db").display());
    let provider = SqliteProvider::connect(&url).await.unwrap();
    (dir, provider)
}

fn text(values: &[&str]) -> Row {
    values.iter().map(|v| Some(v.to_string())).collect()
}

// =============================================================================
// Value Rendering Tests
// =============================================================================

#[tokio::test]
async fn test_query_renders_storage_classes_as_text() {
    let (_dir, provider) = scratch_provider().await;
    let mut conn = provider.acquire().await.unwrap();

    conn.execute("CREATE TABLE t (i INTEGER, r REAL, s TEXT, n TEXT, b BLOB)")
        .await
        .unwrap();
    conn.execute("INSERT INTO t VALUES (42, 10.5, 'O''Brien', NULL, x'0102')")
        .await
        .unwrap();

    let rows: Vec<Row> = conn
        .query("SELECT i, r, s, n, b FROM t")
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![vec![
            Some("42".to_string()),
            Some("10.5".to_string()),
            Some("O'Brien".to_string()),
            None,
            Some("AQI=".to_string()),
        ]]
    );
}

#[tokio::test]
async fn test_query_streams_rows_in_order() {
    let (_dir, provider) = scratch_provider().await;
    let mut conn = provider.acquire().await.unwrap();
    conn.execute("CREATE TABLE t (v TEXT)").await.unwrap();
    conn.execute("INSERT INTO t (v) VALUES ('a'), ('b'), ('c')")
        .await
        .unwrap();

    let mut rows = conn.query("SELECT v FROM t ORDER BY rowid").await.unwrap();
    assert_eq!(rows.try_next().await.unwrap(), Some(text(&["a"])));
    assert_eq!(rows.try_next().await.unwrap(), Some(text(&["b"])));
    assert_eq!(rows.try_next().await.unwrap(), Some(text(&["c"])));
    assert_eq!(rows.try_next().await.unwrap(), None);
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[tokio::test]
async fn test_execute_failure_is_query_error() {
    let (_dir, provider) = scratch_provider().await;
    let mut conn = provider.acquire().await.unwrap();

    let err = conn
        .execute("INSERT INTO missing (a) VALUES ('1')")
        .await
        .unwrap_err();
    assert!(matches!(err, FlatBridgeError::QueryExecution { .. }));
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn test_query_failure_surfaces_in_stream() {
    let (_dir, provider) = scratch_provider().await;
    let mut conn = provider.acquire().await.unwrap();

    let result: crate::Result<Vec<Row>> = conn
        .query("SELECT a FROM missing")
        .await
        .unwrap()
        .try_collect()
        .await;
    assert!(matches!(
        result.unwrap_err(),
        FlatBridgeError::QueryExecution { .. }
    ));
}

// =============================================================================
// Introspection Statement Tests
// =============================================================================

#[tokio::test]
async fn test_dialect_statements_run_on_sqlite() {
    let (_dir, provider) = scratch_provider().await;
    let mut conn = provider.acquire().await.unwrap();
    assert_eq!(conn.dialect(), Dialect::Sqlite);

    conn.execute("CREATE TABLE orders (id TEXT, amount TEXT)")
        .await
        .unwrap();
    conn.execute("CREATE TABLE customers (id TEXT)").await.unwrap();

    let tables: Vec<Row> = conn
        .query(&Dialect::Sqlite.show_tables(MAIN_DATABASE))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(tables, vec![text(&["customers"]), text(&["orders"])]);

    let describe = Dialect::Sqlite.describe_table("orders");
    let columns: Vec<Row> = conn
        .query(&describe)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    let index = Dialect::Sqlite.describe_name_index();
    let names: Vec<String> = columns
        .into_iter()
        .filter_map(|row| row.into_iter().nth(index).flatten())
        .collect();
    assert_eq!(names, vec!["id", "amount"]);
}

#[tokio::test]
async fn test_server_version_and_provider_metadata() {
    let (_dir, provider) = scratch_provider().await;
    assert_eq!(provider.default_database(), "main");
    assert!(provider.describe().starts_with("sqlite://"));

    let mut conn = provider.acquire().await.unwrap();
    let version = conn.server_version().await.unwrap();
    assert!(version.starts_with('3'));
}
