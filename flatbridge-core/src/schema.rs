//! Table and column discovery ahead of a transfer.

use crate::Result;
use crate::adapters::SharedProvider;
use crate::error::FlatBridgeError;
use futures::TryStreamExt;
use tracing::debug;

/// Lists tables and columns through a connection provider.
pub struct SchemaInspector {
    provider: SharedProvider,
}

impl SchemaInspector {
    /// Creates an inspector over a provider snapshot.
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Lists the tables of `database`, in the order the server reports them.
    ///
    /// # Errors
    /// Returns a connection error if no connection can be acquired and a
    /// query error if the listing fails (for example an unknown database).
    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let mut conn = self.provider.acquire().await?;
        let sql = conn.dialect().show_tables(database);
        debug!("Listing tables: {}", sql);

        let tables: Vec<String> = conn
            .query(&sql)
            .await?
            .try_filter_map(|row| async move { Ok(row.into_iter().next().flatten()) })
            .try_collect()
            .await?;

        debug!("Found {} tables in {}", tables.len(), database);
        Ok(tables)
    }

    /// Lists the column names of `table` in declaration order.
    ///
    /// # Errors
    /// Returns a query error if the table does not exist (including a
    /// table that reports no columns) or the query fails.
    pub async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut conn = self.provider.acquire().await?;
        let dialect = conn.dialect();
        let sql = dialect.describe_table(table);
        let name_index = dialect.describe_name_index();
        debug!("Describing table: {}", sql);

        let columns: Vec<String> = conn
            .query(&sql)
            .await?
            .try_filter_map(|row| async move { Ok(row.into_iter().nth(name_index).flatten()) })
            .try_collect()
            .await?;

        if columns.is_empty() {
            return Err(FlatBridgeError::query_failed(format!(
                "Table '{}' does not exist or has no columns",
                table
            )));
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockProvider;
    use std::sync::Arc;

    fn row(values: &[&str]) -> crate::models::Row {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[tokio::test]
    async fn test_list_tables_scopes_to_database() {
        let mock = MockProvider::new();
        mock.register(
            "SHOW TABLES FROM `uk_price_paid`",
            vec![row(&["orders"]), row(&["uk_price_paid"])],
        );
        let inspector = SchemaInspector::new(Arc::new(mock.clone()));

        let tables = inspector.list_tables("uk_price_paid").await.unwrap();
        assert_eq!(tables, vec!["orders", "uk_price_paid"]);
        assert_eq!(mock.acquired(), 1);
    }

    #[tokio::test]
    async fn test_list_columns_reads_name_field_and_escapes_table() {
        let mock = MockProvider::new();
        mock.register(
            "DESCRIBE TABLE `order``s`",
            vec![
                row(&["id", "UInt64", "", "", "", "", ""]),
                row(&["amount", "Decimal(10, 2)", "", "", "", "", ""]),
            ],
        );
        let inspector = SchemaInspector::new(Arc::new(mock));

        let columns = inspector.list_columns("order`s").await.unwrap();
        assert_eq!(columns, vec!["id", "amount"]);
    }

    #[tokio::test]
    async fn test_list_columns_without_columns_is_query_error() {
        let mock = MockProvider::new();
        mock.register("DESCRIBE TABLE `ghost`", vec![]);
        let inspector = SchemaInspector::new(Arc::new(mock));

        let err = inspector.list_columns("ghost").await.unwrap_err();
        assert!(matches!(err, FlatBridgeError::QueryExecution { .. }));
    }

    #[tokio::test]
    async fn test_list_tables_propagates_query_failure() {
        let mock = MockProvider::new();
        let inspector = SchemaInspector::new(Arc::new(mock));

        let err = inspector.list_tables("nope").await.unwrap_err();
        assert!(matches!(err, FlatBridgeError::QueryExecution { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let mock = MockProvider::new();
        mock.refuse_connections();
        let inspector = SchemaInspector::new(Arc::new(mock));

        let err = inspector.list_tables("default").await.unwrap_err();
        assert!(matches!(err, FlatBridgeError::Connection { .. }));
        assert!(err.to_string().contains("Connection refused"));
    }
}
