//! Data model shared by the engines and the boundary service.

use crate::error::FlatBridgeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// One result row; `None` is SQL NULL.
pub type Row = Vec<Option<String>>;

/// Single-character field delimiter for flat files.
///
/// Validation happens when the delimiter is parsed at the boundary, so the
/// engines can rely on it. The CSV codec is byte oriented, so the character
/// must be ASCII, and it cannot collide with the quote or line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Delimiter(u8);

impl Delimiter {
    /// Comma, the default delimiter.
    pub const COMMA: Delimiter = Delimiter(b',');

    /// The delimiter as a byte, as the CSV codec wants it.
    pub fn as_byte(self) -> u8 {
        self.0
    }

    /// The delimiter as a char.
    pub fn as_char(self) -> char {
        char::from(self.0)
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::COMMA
    }
}

impl TryFrom<char> for Delimiter {
    type Error = FlatBridgeError;

    fn try_from(ch: char) -> Result<Self, Self::Error> {
        if !ch.is_ascii() {
            return Err(FlatBridgeError::validation(format!(
                "Delimiter must be an ASCII character, got '{}'",
                ch
            )));
        }
        if matches!(ch, '"' | '\n' | '\r') {
            return Err(FlatBridgeError::validation(format!(
                "Delimiter {:?} conflicts with CSV quoting or line endings",
                ch
            )));
        }
        Ok(Self(ch as u8))
    }
}

impl FromStr for Delimiter {
    type Err = FlatBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Delimiter::try_from(ch),
            _ => Err(FlatBridgeError::validation(format!(
                "Delimiter must be exactly one character, got {:?}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Delimiter {
    type Error = FlatBridgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Delimiter> for String {
    fn from(delimiter: Delimiter) -> Self {
        delimiter.as_char().to_string()
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An N-way join: ordered tables plus one predicate reused for every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSpec {
    /// Tables in join order; at least two are required for an export
    pub tables: Vec<String>,
    /// Predicate spliced verbatim after every `ON`
    pub join_condition: String,
}

impl JoinSpec {
    /// Creates a join spec.
    pub fn new(tables: Vec<String>, join_condition: impl Into<String>) -> Self {
        Self {
            tables,
            join_condition: join_condition.into(),
        }
    }
}

/// Source/destination descriptor of a single-table transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDescriptor {
    /// Database table
    pub table: String,
    /// Columns in projection and file order
    pub columns: Vec<String>,
    /// Flat file path
    pub file: PathBuf,
    /// Field delimiter
    #[serde(default)]
    pub delimiter: Delimiter,
}

/// Descriptor of a join export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDescriptor {
    /// Tables and join predicate
    #[serde(flatten)]
    pub join: JoinSpec,
    /// Columns in projection and file order
    pub columns: Vec<String>,
    /// Destination file
    pub file: PathBuf,
    /// Field delimiter
    #[serde(default)]
    pub delimiter: Delimiter,
}

/// Outcome of a transfer returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    /// Number of data rows moved (header excluded)
    pub record_count: u64,
    /// Human-readable status
    pub message: String,
}

impl TransferResult {
    /// Creates a transfer result.
    pub fn new(record_count: u64, message: impl Into<String>) -> Self {
        Self {
            record_count,
            message: message.into(),
        }
    }
}

/// Where preview data is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewSource {
    /// A database table
    Database,
    /// A delimited flat file
    FlatFile,
}

impl FromStr for PreviewSource {
    type Err = FlatBridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("clickhouse") {
            Ok(Self::Database)
        } else if s.eq_ignore_ascii_case("flatfile") {
            Ok(Self::FlatFile)
        } else {
            Err(FlatBridgeError::validation(
                "Invalid source. Use 'ClickHouse' or 'FlatFile'",
            ))
        }
    }
}
