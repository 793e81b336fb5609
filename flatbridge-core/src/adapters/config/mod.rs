//! Configuration types for database adapters.
//!
//! - `ConnectionConfig`: one ClickHouse target (host, port, database,
//!   credentials)

mod connection;

pub use connection::{ConnectionConfig, DEFAULT_DATABASE, DEFAULT_HTTP_PORT};
