//! Import engine: delimited flat files into database tables.
//!
//! Rows are sent as multi-row `INSERT ... VALUES` statements of a fixed
//! batch size. There is no transaction around the whole import.

use crate::Result;
use crate::adapters::SharedProvider;
use crate::error::FlatBridgeError;
use crate::flatfile;
use crate::models::TransferDescriptor;
use crate::sql;
use tracing::{debug, error, info};

/// Rows per INSERT statement unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Tuning knobs of the import engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Value tuples per INSERT statement; must be greater than zero
    pub batch_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportOptions {
    /// Validates the options.
    ///
    /// # Errors
    /// Returns a validation error for a zero batch size.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FlatBridgeError::validation(
                "batch_size must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Bulk-loads delimited files into tables.
pub struct ImportEngine {
    provider: SharedProvider,
    options: ImportOptions,
}

impl ImportEngine {
    /// Creates an engine with the default batch size.
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            options: ImportOptions::default(),
        }
    }

    /// Creates an engine with custom options.
    ///
    /// # Errors
    /// Returns a validation error for invalid options.
    pub fn with_options(provider: SharedProvider, options: ImportOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { provider, options })
    }

    /// Imports a delimited file into `descriptor.table`.
    ///
    /// The first record is the header and is discarded. Every later record
    /// with at least as many fields as there are columns contributes its
    /// first `columns.len()` fields as one value tuple; shorter records are
    /// skipped. Values are inserted as string literals. Returns the number
    /// of records that were queued for insertion.
    ///
    /// # Partial application
    /// Batches are committed one by one as they are sent. When an INSERT
    /// fails the import stops with a query error, but every batch sent
    /// before it stays in the table. Re-running the same import after a
    /// failure therefore duplicates those rows.
    ///
    /// # Errors
    /// - Validation error for an empty column list or a file with no rows
    /// - I/O error if the file cannot be opened, CSV error if it cannot be
    ///   parsed (both before any connection is acquired for an unreadable
    ///   header)
    /// - Connection error if no connection can be acquired
    /// - Query error if an INSERT fails
    pub async fn import_file(&self, descriptor: &TransferDescriptor) -> Result<u64> {
        let columns = &descriptor.columns;
        if columns.is_empty() {
            return Err(FlatBridgeError::validation("No columns selected"));
        }

        let path = descriptor.file.as_path();
        let mut reader = flatfile::open_reader(path, descriptor.delimiter)?;
        let mut records = reader.records();

        match records.next() {
            Some(header) => {
                header.map_err(|e| FlatBridgeError::csv("read header of", path, e))?;
            }
            None => {
                return Err(FlatBridgeError::validation(format!(
                    "File {} is empty",
                    path.display()
                )));
            }
        }

        info!("Importing {} into table {}", path.display(), descriptor.table);

        let mut conn = self.provider.acquire().await?;
        let dialect = conn.dialect();
        let prefix = sql::insert_prefix(&descriptor.table, columns);
        let batch_size = self.options.batch_size;

        let mut batch: Vec<String> = Vec::with_capacity(batch_size);
        let mut count: u64 = 0;
        let mut batches_sent: u64 = 0;

        for record in records {
            let record = record.map_err(|e| FlatBridgeError::csv("read", path, e))?;
            if record.len() < columns.len() {
                debug!(
                    "Skipping short row at line {}: {} fields, {} expected",
                    record.position().map_or(0, csv::Position::line),
                    record.len(),
                    columns.len()
                );
                continue;
            }

            batch.push(sql::value_tuple(
                dialect,
                record.iter().take(columns.len()),
            ));
            count = count.saturating_add(1);

            if batch.len() >= batch_size {
                flush_batch(&mut *conn, &prefix, &mut batch, batches_sent).await?;
                batches_sent = batches_sent.saturating_add(1);
            }
        }

        if !batch.is_empty() {
            flush_batch(&mut *conn, &prefix, &mut batch, batches_sent).await?;
        }

        info!("Imported {} rows into table {}", count, descriptor.table);
        Ok(count)
    }
}

async fn flush_batch(
    conn: &mut dyn crate::adapters::Connection,
    prefix: &str,
    batch: &mut Vec<String>,
    batches_sent: u64,
) -> Result<()> {
    let statement = format!("{}{}", prefix, batch.join(", "));
    debug!(
        "Inserting batch {} with {} rows",
        batches_sent.saturating_add(1),
        batch.len()
    );

    conn.execute(&statement).await.map_err(|e| {
        error!(
            "Insert failed after {} committed batches: {}",
            batches_sent, e
        );
        e
    })?;
    batch.clear();
    Ok(())
}
