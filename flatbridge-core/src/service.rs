//! Boundary service: the operations a caller (CLI, HTTP layer) invokes.
//!
//! The service owns the current connection provider. Every operation
//! takes one snapshot of it at entry, so a configuration change never
//! affects an operation already in flight.

use crate::Result;
use crate::adapters::{ConnectionConfig, SharedProvider, create_dynamic_provider};
use crate::error::FlatBridgeError;
use crate::export::ExportEngine;
use crate::flatfile;
use crate::import::{ImportEngine, ImportOptions};
use crate::models::{Delimiter, JoinDescriptor, PreviewSource, TransferDescriptor, TransferResult};
use crate::schema::SchemaInspector;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Message of a finished database-to-file export.
pub const EXPORT_COMPLETED: &str = "Ingestion from ClickHouse completed";
/// Message of a finished join export.
pub const JOIN_EXPORT_COMPLETED: &str = "Join Ingestion completed";
/// Message of a finished file-to-database import.
pub const IMPORT_COMPLETED: &str = "Ingestion from FlatFile completed";

/// Entry point for all transfer operations.
pub struct TransferService {
    provider: RwLock<SharedProvider>,
}

impl TransferService {
    /// Creates a service that starts out on the default provider.
    pub fn new(default_provider: SharedProvider) -> Self {
        Self {
            provider: RwLock::new(default_provider),
        }
    }

    async fn snapshot(&self) -> SharedProvider {
        Arc::clone(&*self.provider.read().await)
    }

    /// Replaces the connection configuration and test-connects right away.
    ///
    /// The new configuration takes effect even when the test fails; the
    /// returned text reports the outcome.
    ///
    /// # Errors
    /// Returns [`FlatBridgeError::ConfigurationRejected`], displayed as
    /// `Configuration failed: <cause>`, when the configuration is invalid. The previous provider stays active in
    /// that case.
    pub async fn configure_connection(&self, config: ConnectionConfig) -> Result<String> {
        info!("Configuring connection: {}", config);
        let provider = create_dynamic_provider(config).map_err(|e| {
            let cause = match e {
                FlatBridgeError::Configuration { message } => message,
                other => other.to_string(),
            };
            FlatBridgeError::configuration_rejected(cause)
        })?;

        *self.provider.write().await = provider;
        Ok(self.test_connection().await)
    }

    /// Reports whether a connection can be made, with the server product
    /// and version on success. Never fails.
    pub async fn test_connection(&self) -> String {
        let provider = self.snapshot().await;
        let probe = async {
            let mut conn = provider.acquire().await?;
            let product = conn.dialect();
            let version = conn.server_version().await?;
            Ok::<_, FlatBridgeError>(format!("{} {}", product, version))
        };

        match probe.await {
            Ok(product) => {
                info!("Connection to {} successful", provider.describe());
                format!("Connection successful: {}", product)
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", provider.describe(), e);
                format!("Connection failed: {}", e)
            }
        }
    }

    /// Lists the tables of the active configuration's database.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let provider = self.snapshot().await;
        let database = provider.default_database();
        SchemaInspector::new(provider).list_tables(&database).await
    }

    /// Lists the columns of a table in declaration order.
    pub async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        SchemaInspector::new(self.snapshot().await)
            .list_columns(table)
            .await
    }

    /// Exports one table to a flat file.
    pub async fn export_single_table(
        &self,
        descriptor: &TransferDescriptor,
    ) -> Result<TransferResult> {
        let count = ExportEngine::new(self.snapshot().await)
            .export_single_table(descriptor)
            .await?;
        Ok(TransferResult::new(count, EXPORT_COMPLETED))
    }

    /// Exports an N-way join to a flat file.
    pub async fn export_join(&self, descriptor: &JoinDescriptor) -> Result<TransferResult> {
        let count = ExportEngine::new(self.snapshot().await)
            .export_join(descriptor)
            .await?;
        Ok(TransferResult::new(count, JOIN_EXPORT_COMPLETED))
    }

    /// Imports a flat file into a table in batches of the default size.
    /// See [`ImportEngine::import_file`] for the partial-application caveat.
    pub async fn import_file(&self, descriptor: &TransferDescriptor) -> Result<TransferResult> {
        self.import_file_with(descriptor, ImportOptions::default()).await
    }

    /// Imports a flat file with custom batching options.
    ///
    /// # Errors
    /// Returns a validation error for invalid options, before anything is
    /// read or sent.
    pub async fn import_file_with(
        &self,
        descriptor: &TransferDescriptor,
        options: ImportOptions,
    ) -> Result<TransferResult> {
        let engine = ImportEngine::with_options(self.snapshot().await, options)?;
        let count = engine.import_file(descriptor).await?;
        Ok(TransferResult::new(count, IMPORT_COMPLETED))
    }

    /// Returns preview rows from a table or a flat file.
    ///
    /// For [`PreviewSource::Database`] the given columns are selected from
    /// `table`, or all of its columns when none are given; `file` is
    /// ignored. Column lookup and SELECT run against the same provider. For [`PreviewSource::FlatFile`] every record of `file` is
    /// returned, header included; `table` and `columns` are ignored.
    pub async fn preview_data(
        &self,
        source: PreviewSource,
        table: &str,
        file: &Path,
        delimiter: Delimiter,
        columns: Option<&[String]>,
    ) -> Result<Vec<Vec<String>>> {
        match source {
            PreviewSource::Database => {
                let provider = self.snapshot().await;
                let columns = match columns {
                    Some(columns) if !columns.is_empty() => columns.to_vec(),
                    _ => {
                        SchemaInspector::new(Arc::clone(&provider))
                            .list_columns(table)
                            .await?
                    }
                };
                ExportEngine::new(provider)
                    .export_raw_query(table, &columns)
                    .await
            }
            PreviewSource::FlatFile => flatfile::read_all(file, delimiter),
        }
    }
}
