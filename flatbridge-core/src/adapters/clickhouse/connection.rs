//! HTTP endpoint, client construction and the per-operation connection.
//!
//! Every statement is one POST to the HTTP interface with the SQL as the
//! request body. User name and password travel in the `X-ClickHouse-User`
//! and `X-ClickHouse-Key` headers; only the database and the optional `jwt`
//! token are part of the URL, and the URL is redacted before it is logged.

use super::tsv;
use crate::Result;
use crate::adapters::config::ConnectionConfig;
use crate::adapters::{Connection, RowStream};
use crate::error::FlatBridgeError;
use crate::security::Credentials;
use crate::sql::Dialect;
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

const USER_HEADER: &str = "X-ClickHouse-User";
const KEY_HEADER: &str = "X-ClickHouse-Key";
const EXCEPTION_HEADER: &str = "X-ClickHouse-Exception-Code";

/// Builds `http(s)://host:port/?database=<db>[&jwt=<token>]`.
///
/// # Errors
/// Returns a configuration error if host and port do not form a valid URL.
pub(crate) fn endpoint_url(config: &ConnectionConfig) -> Result<Url> {
    let scheme = if config.secure { "https" } else { "http" };
    let mut url = Url::parse(&format!("{}://{}:{}/", scheme, config.host, config.port))
        .map_err(|e| {
            FlatBridgeError::configuration(format!(
                "Invalid ClickHouse endpoint for host '{}': {}",
                config.host, e
            ))
        })?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("database", &config.database);
        if let Some(token) = config.credentials.auth_token() {
            pairs.append_pair("jwt", token);
        }
    }

    Ok(url)
}

/// Builds the HTTP client for a configuration.
///
/// With `keep_alive` off the client holds no idle sockets, so every
/// connection it makes is new.
pub(crate) fn build_client(config: &ConnectionConfig, keep_alive: bool) -> Result<Client> {
    let mut builder = Client::builder().connect_timeout(config.connect_timeout);
    if !keep_alive {
        builder = builder.pool_max_idle_per_host(0);
    }
    builder
        .build()
        .map_err(|e| FlatBridgeError::connection_failed(e.without_url()))
}

/// One logical connection to a ClickHouse server.
pub(crate) struct ClickHouseConnection {
    client: Client,
    endpoint: Url,
    credentials: Credentials,
}

impl ClickHouseConnection {
    /// Opens a connection and verifies it with `SELECT 1`.
    ///
    /// # Errors
    /// Returns a connection error when the server is unreachable or rejects
    /// the credentials.
    pub(crate) async fn open(
        client: Client,
        endpoint: Url,
        credentials: Credentials,
    ) -> Result<Self> {
        let connection = Self {
            client,
            endpoint,
            credentials,
        };
        connection.ping().await?;
        Ok(connection)
    }

    fn request(&self, sql: String) -> RequestBuilder {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(USER_HEADER, self.credentials.username())
            .body(sql);
        if let Some(password) = self.credentials.password() {
            request = request.header(KEY_HEADER, password);
        }
        request
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .request("SELECT 1".to_string())
            .send()
            .await
            .map_err(|e| FlatBridgeError::connection_failed(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlatBridgeError::connection_rejected(format!(
                "ClickHouse rejected the connection ({}): {}",
                status,
                body.trim()
            )));
        }
        Ok(())
    }

    /// Sends one statement and checks the server accepted it.
    async fn send(&self, sql: String) -> Result<Response> {
        let response = self
            .request(sql)
            .send()
            .await
            .map_err(|e| FlatBridgeError::connection_failed(e.without_url()))?;

        let status = response.status();
        if !status.is_success() || response.headers().contains_key(EXCEPTION_HEADER) {
            let body = response.text().await.unwrap_or_default();
            return Err(FlatBridgeError::query_failed(format!(
                "ClickHouse error ({}): {}",
                status,
                body.trim()
            )));
        }
        Ok(response)
    }
}

/// Appends the output format clause the row decoder expects.
pub(crate) fn with_tsv_format(sql: &str) -> String {
    format!(
        "{} FORMAT TabSeparated",
        sql.trim_end().trim_end_matches(';')
    )
}

#[async_trait]
impl Connection for ClickHouseConnection {
    fn dialect(&self) -> Dialect {
        Dialect::ClickHouse
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        let response = self.send(with_tsv_format(sql)).await?;
        Ok(tsv::decode_rows(
            response.bytes_stream().map_err(reqwest::Error::without_url),
        ))
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let response = self.send(sql.to_string()).await?;
        response
            .bytes()
            .await
            .map_err(|e| FlatBridgeError::connection_failed(e.without_url()))?;
        Ok(())
    }
}
