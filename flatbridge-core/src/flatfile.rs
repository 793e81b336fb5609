//! Delimited flat-file codec shared by export, import and preview.
//!
//! Files use `\n` line endings and double-quote quoting: a field is quoted
//! only when it contains the delimiter, a quote or a line break, and
//! embedded quotes are doubled. Readers are flexible so that short rows
//! reach the import engine instead of failing the parse.

use crate::Result;
use crate::error::FlatBridgeError;
use crate::models::{Delimiter, Row};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use std::fs::File;
use std::path::Path;

const QUOTE: u8 = b'"';

/// Writer settings for a delimiter.
pub fn writer_builder(delimiter: Delimiter) -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .delimiter(delimiter.as_byte())
        .quote(QUOTE)
        .double_quote(true)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'));
    builder
}

/// Reader settings for a delimiter. Headers are handed to the caller as
/// the first record.
pub fn reader_builder(delimiter: Delimiter) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(delimiter.as_byte())
        .quote(QUOTE)
        .double_quote(true)
        .has_headers(false)
        .flexible(true);
    builder
}

/// Streaming writer over a truncated-and-created file.
pub struct FlatFileWriter {
    inner: csv::Writer<File>,
    path: std::path::PathBuf,
}

impl FlatFileWriter {
    /// Creates (or truncates) the destination file.
    ///
    /// # Errors
    /// Returns an I/O error naming the path if the file cannot be created.
    pub fn create(path: &Path, delimiter: Delimiter) -> Result<Self> {
        let file = File::create(path).map_err(|e| FlatBridgeError::io("create", path, e))?;
        Ok(Self {
            inner: writer_builder(delimiter).from_writer(file),
            path: path.to_path_buf(),
        })
    }

    /// Writes the header row of raw column names.
    pub fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.inner
            .write_record(columns)
            .map_err(|e| FlatBridgeError::csv("write header to", &self.path, e))
    }

    /// Writes one data row; NULL becomes an empty field.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.inner
            .write_record(row.iter().map(|field| field.as_deref().unwrap_or("")))
            .map_err(|e| FlatBridgeError::csv("write row to", &self.path, e))
    }

    /// Flushes buffered rows to disk.
    pub fn finish(mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| FlatBridgeError::io("flush", &self.path, e))
    }
}

/// Opens a delimited file for record-by-record reading.
///
/// # Errors
/// Returns an I/O error naming the path if the file cannot be opened.
pub fn open_reader(path: &Path, delimiter: Delimiter) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| FlatBridgeError::io("open", path, e))?;
    Ok(reader_builder(delimiter).from_reader(file))
}

/// Reads every record of a delimited file, header included.
///
/// # Errors
/// Returns an I/O error if the file cannot be opened and a CSV error if it
/// cannot be parsed.
pub fn read_all(path: &Path, delimiter: Delimiter) -> Result<Vec<Vec<String>>> {
    let mut reader = open_reader(path, delimiter)?;
    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| FlatBridgeError::csv("read", path, e))
        })
        .collect()
}
