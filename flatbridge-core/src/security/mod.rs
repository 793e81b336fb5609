//! Credential handling.
//!
//! - `credentials`: secret container with automatic memory zeroing
//! - `connection`: connection URL parsing with credential extraction
//!
//! Passwords and tokens are kept in `Zeroizing` containers and redacted
//! from `Debug`, `Display`, logs and error messages.

mod connection;
mod credentials;

pub use connection::parse_connection_url;
pub use credentials::{Credentials, DEFAULT_USERNAME};
