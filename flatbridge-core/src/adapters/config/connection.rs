//! Database connection configuration.
//!
//! This module provides the `ConnectionConfig` struct describing one
//! ClickHouse target, as supplied dynamically by a caller or derived from
//! the default connection URL.

use crate::security::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ClickHouse HTTP interface port.
pub const DEFAULT_HTTP_PORT: u16 = 8123;

/// Database used when none is named.
pub const DEFAULT_DATABASE: &str = "default";

/// Configuration for a database connection.
///
/// Immutable once handed to a provider: a new configuration replaces the
/// old one wholesale, it is never merged into it.
///
/// The serialized form carries no password or auth token.
///
/// # Example
/// ```rust
/// use flatbridge_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(8123)
///     .with_database("uk_price_paid".to_string())
///     .with_username("reader".to_string());
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.to_string(), "ConnectionConfig(localhost:8123/uk_price_paid)");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Server host name or address
    pub host: String,
    /// HTTP interface port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Database that queries run against
    #[serde(default = "default_database")]
    pub database: String,
    /// Use https instead of http
    #[serde(default)]
    pub secure: bool,
    /// User name, password and optional auth token
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Connection timeout duration
    #[serde(skip, default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

fn default_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_port(),
            database: default_database(),
            secure: false,
            credentials: Credentials::default(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials are never part of the display form.
        write!(
            f,
            "ConnectionConfig({}:{}/{})",
            self.host, self.port, self.database
        )
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns a configuration error for an empty host or database, port 0,
    /// or a zero connect timeout.
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::error::FlatBridgeError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::FlatBridgeError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.database.trim().is_empty() {
            return Err(crate::error::FlatBridgeError::configuration(
                "database cannot be empty",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::FlatBridgeError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with defaults for everything but the host.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: String) -> Self {
        self.database = database;
        self
    }

    /// Builder method to set username.
    pub fn with_username(mut self, username: String) -> Self {
        self.credentials.set_username(username);
        self
    }

    /// Builder method to set password.
    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.credentials.set_password(password);
        self
    }

    /// Builder method to set the auth token.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.credentials = self.credentials.with_auth_token(token);
        self
    }

    /// Builder method to switch to https.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
