//! Secure credential container with automatic memory zeroing.
//!
//! Password and auth token live in `Zeroizing` containers so they are
//! cleared from memory when the credentials are dropped, and they are never
//! printed by `Debug` or written out by `Serialize`.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use zeroize::Zeroizing;

/// User name used when none is supplied; ClickHouse's built-in account.
pub const DEFAULT_USERNAME: &str = "default";

/// Database credentials: user name, optional password, optional auth token.
///
/// # Example
///
/// ```rust
/// use flatbridge_core::security::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Deserialize)]
#[serde(from = "RawCredentials")]
pub struct Credentials {
    username: String,
    password: Zeroizing<Option<String>>,
    auth_token: Zeroizing<Option<String>>,
}

/// Wire shape of credentials inside a connection request.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    #[serde(default = "default_username")]
    username: String,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, alias = "jwtToken", alias = "token")]
    auth_token: Option<String>,
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

impl From<RawCredentials> for Credentials {
    fn from(raw: RawCredentials) -> Self {
        Self::new(raw.username, raw.password).with_auth_token(raw.auth_token)
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(default_username(), None)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.is_some().then_some("****"))
            .field("auth_token", &self.auth_token.is_some().then_some("****"))
            .finish()
    }
}

/// Only the user name is serialized; secrets never leave the process
/// through serde.
impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Credentials", 1)?;
        state.serialize_field("username", &self.username)?;
        state.end()
    }
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username,
            password: Zeroizing::new(password),
            auth_token: Zeroizing::new(None),
        }
    }

    /// Attaches a bearer/auth token. Empty tokens count as absent.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = Zeroizing::new(token.filter(|t| !t.is_empty()));
        self
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Gets the password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Gets the auth token, if any.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Replaces the username, keeping secrets.
    pub(crate) fn set_username(&mut self, username: String) {
        self.username = username;
    }

    /// Replaces the password.
    pub(crate) fn set_password(&mut self, password: Option<String>) {
        self.password = Zeroizing::new(password);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = Credentials::new("testuser".to_string(), Some("testpass".to_string()));
        assert_eq!(creds.username(), "testuser");
        assert_eq!(creds.password(), Some("testpass"));
        assert!(creds.auth_token().is_none());
    }

    #[test]
    fn test_empty_token_is_absent() {
        let creds = Credentials::default().with_auth_token(Some(String::new()));
        assert!(creds.auth_token().is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new("u".to_string(), Some("hunter2".to_string()))
            .with_auth_token(Some("eyJtoken".to_string()));
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("eyJtoken"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_deserialize_with_jwt_alias() {
        let creds: Credentials =
            serde_json::from_str(r#"{"username": "reader", "password": "p", "jwtToken": "tok"}"#)
                .unwrap();
        assert_eq!(creds.username(), "reader");
        assert_eq!(creds.auth_token(), Some("tok"));
    }

    #[test]
    fn test_deserialize_defaults_username() {
        let creds: Credentials = serde_json::from_str("{}").unwrap();
        assert_eq!(creds.username(), DEFAULT_USERNAME);
        assert!(!creds.has_password());
    }
}
