//! Export engine: database rows to delimited flat files.
//!
//! Rows are written as they come off the result stream; only the current
//! network chunk and the CSV writer's buffer are held in memory.

use crate::Result;
use crate::adapters::SharedProvider;
use crate::error::FlatBridgeError;
use crate::flatfile::FlatFileWriter;
use crate::models::{Delimiter, JoinDescriptor, TransferDescriptor};
use crate::sql;
use futures::TryStreamExt;
use std::path::Path;
use tracing::{debug, info};

/// Streams query results into delimited files.
pub struct ExportEngine {
    provider: SharedProvider,
}

impl ExportEngine {
    /// Creates an engine over a provider snapshot.
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Exports the chosen columns of one table.
    ///
    /// The file gets a header row of the raw column names followed by one
    /// row per result row. Returns the number of data rows written.
    ///
    /// # Errors
    /// - Validation error for an empty column list (nothing is touched)
    /// - Connection error if no connection can be acquired
    /// - Query error if the SELECT fails
    /// - I/O or CSV error if the file cannot be written
    pub async fn export_single_table(&self, descriptor: &TransferDescriptor) -> Result<u64> {
        require_columns(&descriptor.columns)?;

        let query = sql::build_select(&descriptor.table, &descriptor.columns);
        info!(
            "Exporting table {} to {}",
            descriptor.table,
            descriptor.file.display()
        );
        self.stream_to_file(
            &query,
            &descriptor.columns,
            &descriptor.file,
            descriptor.delimiter,
        )
        .await
    }

    /// Exports the chosen columns of an N-way join.
    ///
    /// Every join step reuses the same condition text:
    /// `FROM t0 JOIN t1 ON <cond> JOIN t2 ON <cond> ...`.
    ///
    /// # Errors
    /// Validation error when fewer than two tables or no columns are given;
    /// otherwise as [`ExportEngine::export_single_table`].
    pub async fn export_join(&self, descriptor: &JoinDescriptor) -> Result<u64> {
        let join = &descriptor.join;
        if join.tables.len() < 2 {
            return Err(FlatBridgeError::validation(
                "At least two tables required for join",
            ));
        }
        require_columns(&descriptor.columns)?;

        let query = sql::build_join_select(&join.tables, &join.join_condition, &descriptor.columns);
        info!(
            "Exporting join of {} tables to {}",
            join.tables.len(),
            descriptor.file.display()
        );
        self.stream_to_file(
            &query,
            &descriptor.columns,
            &descriptor.file,
            descriptor.delimiter,
        )
        .await
    }

    /// Runs a SELECT over the given columns and returns every row in
    /// memory, NULL as empty text. Meant for small previews only.
    ///
    /// # Errors
    /// Validation error for an empty column list; connection and query
    /// errors as for the file exports.
    pub async fn export_raw_query(&self, table: &str, columns: &[String]) -> Result<Vec<Vec<String>>> {
        require_columns(columns)?;

        let query = sql::build_select(table, columns);
        debug!("Preview query: {}", query);

        let mut conn = self.provider.acquire().await?;
        let rows: Vec<Vec<String>> = conn
            .query(&query)
            .await?
            .map_ok(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .try_collect()
            .await?;

        debug!("Preview returned {} rows", rows.len());
        Ok(rows)
    }

    async fn stream_to_file(
        &self,
        query: &str,
        columns: &[String],
        file: &Path,
        delimiter: Delimiter,
    ) -> Result<u64> {
        debug!("Export query: {}", query);
        let mut conn = self.provider.acquire().await?;
        let mut rows = conn.query(query).await?;

        let mut writer = FlatFileWriter::create(file, delimiter)?;
        writer.write_header(columns)?;

        let mut count: u64 = 0;
        while let Some(row) = rows.try_next().await? {
            writer.write_row(&row)?;
            count = count.saturating_add(1);
        }
        writer.finish()?;

        info!("Exported {} rows to {}", count, file.display());
        Ok(count)
    }
}

fn require_columns(columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(FlatBridgeError::validation("No columns selected"));
    }
    Ok(())
}
