//! Core of flatbridge: moves tabular data between ClickHouse and delimited
//! flat files.
//!
//! This crate provides the transfer engines, the connection layer and the
//! boundary service shared by the `flatbridge` binary and any other caller.
//!
//! # Security Guarantees
//! - Passwords and auth tokens are held in zeroizing containers
//! - No credentials in logs, `Display`/`Debug` output or error messages
//! - Identifiers are backtick-escaped and values quoted as literals
//!
//! # Architecture
//! - Trait-based connection providers behind a factory, one per backend
//! - Engines built per call over an immutable provider snapshot
//! - Streaming export; batched import without a surrounding transaction
//!
//! # Example
//! ```rust,no_run
//! use flatbridge_core::{Delimiter, TransferDescriptor, TransferService};
//! use flatbridge_core::adapters::create_default_provider;
//!
//! # async fn run() -> flatbridge_core::Result<()> {
//! let provider = create_default_provider("clickhouse://default@localhost:8123/default").await?;
//! let service = TransferService::new(provider);
//!
//! let result = service
//!     .export_single_table(&TransferDescriptor {
//!         table: "orders".to_string(),
//!         columns: vec!["id".to_string(), "amount".to_string()],
//!         file: "orders.csv".into(),
//!         delimiter: Delimiter::COMMA,
//!     })
//!     .await?;
//! println!("{} rows: {}", result.record_count, result.message);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod error;
pub mod export;
pub mod flatfile;
pub mod import;
pub mod logging;
pub mod models;
pub mod schema;
pub mod security;
pub mod service;
pub mod sql;

// Re-export commonly used types
pub use adapters::{Connection, ConnectionConfig, ConnectionProvider, SharedProvider};
pub use error::{FlatBridgeError, Result};
pub use export::ExportEngine;
pub use import::{ImportEngine, ImportOptions};
pub use logging::init_logging;
pub use models::{
    Delimiter, JoinDescriptor, JoinSpec, PreviewSource, Row, TransferDescriptor, TransferResult,
};
pub use schema::SchemaInspector;
pub use service::TransferService;
