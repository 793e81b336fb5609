//! ClickHouse adapter over the HTTP interface.
//!
//! # Module Structure
//! - `connection`: endpoint URL, client construction and the connection
//! - `tsv`: streaming decoder for `TabSeparated` result bodies
//!
//! # Providers
//! - [`ClickHousePool`]: built once from the default settings; every acquire
//!   reuses one keep-alive client.
//! - [`DynamicClickHouse`]: built from a caller-supplied configuration; every
//!   acquire builds a new client and opens a new connection.

mod connection;
mod tsv;


use super::config::ConnectionConfig;
use super::{Connection, ConnectionProvider};
use crate::Result;
use crate::error::redact_connection_url;
use async_trait::async_trait;
use connection::ClickHouseConnection;
use tracing::debug;
use url::Url;

/// Default provider: one shared HTTP client for every acquire.
pub struct ClickHousePool {
    client: reqwest::Client,
    endpoint: Url,
    config: ConnectionConfig,
}

impl std::fmt::Debug for ClickHousePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHousePool")
            .field("config", &self.config)
            // endpoint may carry the jwt token
            .finish_non_exhaustive()
    }
}

impl ClickHousePool {
    /// Creates the pooled provider. No request is made until the first
    /// acquire.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid configuration.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = connection::endpoint_url(&config)?;
        let client = connection::build_client(&config, true)?;
        Ok(Self {
            client,
            endpoint,
            config,
        })
    }
}

#[async_trait]
impl ConnectionProvider for ClickHousePool {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        debug!("Acquiring pooled connection to {}", self.describe());
        let connection = ClickHouseConnection::open(
            self.client.clone(),
            self.endpoint.clone(),
            self.config.credentials.clone(),
        )
        .await?;
        Ok(Box::new(connection))
    }

    fn default_database(&self) -> String {
        self.config.database.clone()
    }

    fn describe(&self) -> String {
        redact_connection_url(self.endpoint.as_str())
    }
}

/// Provider for a dynamically supplied configuration: a new connection on
/// every acquire, nothing shared between acquires.
pub struct DynamicClickHouse {
    endpoint: Url,
    config: ConnectionConfig,
}

impl std::fmt::Debug for DynamicClickHouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicClickHouse")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DynamicClickHouse {
    /// Creates the dynamic provider.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid configuration.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = connection::endpoint_url(&config)?;
        Ok(Self { endpoint, config })
    }
}

#[async_trait]
impl ConnectionProvider for DynamicClickHouse {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        debug!("Opening new connection to {}", self.describe());
        let client = connection::build_client(&self.config, false)?;
        let connection = ClickHouseConnection::open(
            client,
            self.endpoint.clone(),
            self.config.credentials.clone(),
        )
        .await?;
        Ok(Box::new(connection))
    }

    fn default_database(&self) -> String {
        self.config.database.clone()
    }

    fn describe(&self) -> String {
        redact_connection_url(self.endpoint.as_str())
    }
}
