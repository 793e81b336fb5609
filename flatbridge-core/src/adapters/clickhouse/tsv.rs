//! Decoding of ClickHouse `TabSeparated` output.
//!
//! One row per line, fields separated by tabs, `\N` for NULL. Tabs,
//! newlines and backslashes inside values are backslash-escaped, so a raw
//! `\n` byte always ends a row and lines can be cut from the body as it
//! streams in.
//!
//! A query that fails after the server has started sending a `200` body
//! cannot change the status any more. ClickHouse then writes the exception
//! text (`Code: 241. DB::Exception: ...`) into the body and closes it, so
//! every line is checked for that marker before it is decoded.

use crate::adapters::RowStream;
use crate::error::FlatBridgeError;
use crate::models::Row;
use futures::{Stream, StreamExt, stream};
use regex::bytes::Regex;
use std::pin::Pin;
use std::sync::OnceLock;

/// Marker of an exception written into an already streaming body.
fn exception_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Code: \d+\. DB::Exception:").expect("Invalid exception pattern")
    })
}

/// Returns the query error carried by a body line, if any. The exception
/// may follow a partially written row on the same line.
fn stream_exception(line: &[u8]) -> Option<FlatBridgeError> {
    exception_pattern().find(line).map(|found| {
        FlatBridgeError::query_failed(format!(
            "ClickHouse error while streaming: {}",
            String::from_utf8_lossy(&line[found.start()..]).trim()
        ))
    })
}

/// Undoes TabSeparated escaping for one field.
fn unescape_field(raw: &[u8]) -> Option<String> {
    if raw == b"\\N" {
        return None;
    }
    if !raw.contains(&b'\\') {
        return Some(String::from_utf8_lossy(raw).into_owned());
    }

    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter();
    while let Some(&b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'r') => out.push(b'\r'),
            Some(b'b') => out.push(0x08),
            Some(b'f') => out.push(0x0c),
            Some(b'0') => out.push(0),
            Some(b'a') => out.push(0x07),
            Some(b'v') => out.push(0x0b),
            Some(&other) => out.push(other),
            None => out.push(b'\\'),
        }
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

/// Splits one TabSeparated line (without its `\n`) into a row.
fn parse_line(line: &[u8]) -> Row {
    line.split(|&b| b == b'\t').map(unescape_field).collect()
}

/// Line splitter over a chunked response body.
struct LineBuffer<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    consumed: usize,
    finished: bool,
}

impl<S> LineBuffer<S> {
    /// Cuts the next complete line out of the buffer. Once the body has
    /// ended, a trailing line without `\n` is returned as well.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let pending = &self.buffer[self.consumed..];
        if let Some(pos) = pending.iter().position(|&b| b == b'\n') {
            let line = pending[..pos].to_vec();
            self.consumed += pos + 1;
            return Some(line);
        }
        if self.finished && !pending.is_empty() {
            let line = pending.to_vec();
            self.consumed = self.buffer.len();
            return Some(line);
        }
        None
    }

    fn push_chunk(&mut self, chunk: &[u8]) {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.consumed = 0;
        }
        self.buffer.extend_from_slice(chunk);
    }
}

/// Turns a chunked TabSeparated body into a stream of rows.
pub(crate) fn decode_rows<'a, S, B, E>(body: S) -> RowStream<'a>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'a,
    B: AsRef<[u8]> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineBuffer {
        body: Box::pin(body),
        buffer: Vec::new(),
        consumed: 0,
        finished: false,
    };

    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.next_line() {
                if let Some(error) = stream_exception(&line) {
                    return Err(error);
                }
                return Ok::<_, FlatBridgeError>(Some((parse_line(&line), state)));
            }
            if state.finished {
                return Ok(None);
            }
            match state.body.next().await {
                Some(chunk) => {
                    let chunk = chunk.map_err(FlatBridgeError::connection_failed)?;
                    state.push_chunk(chunk.as_ref());
                }
                None => state.finished = true,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use futures::TryStreamExt;

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = std::io::Result<&'static [u8]>> {
        stream::iter(parts.iter().map(|p| Ok(p.as_bytes())).collect::<Vec<_>>())
    }

    #[test]
    fn test_parse_line_with_null_and_escapes() {
        let row = parse_line(b"1\t\\N\ta\\tb\\nc\\\\d");
        assert_eq!(
            row,
            vec![
                Some("1".to_string()),
                None,
                Some("a\tb\nc\\d".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_line_single_empty_field() {
        assert_eq!(parse_line(b""), vec![Some(String::new())]);
    }

    #[tokio::test]
    async fn test_decode_rows_across_chunk_boundaries() {
        let rows: Vec<Row> = decode_rows(chunks(&["1\t10.", "50\n2\t7,00\n3", "\t3.00\n"]))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec![Some("2".to_string()), Some("7,00".to_string())]);
        assert_eq!(rows[2], vec![Some("3".to_string()), Some("3.00".to_string())]);
    }

    #[tokio::test]
    async fn test_decode_rows_trailing_line_without_newline() {
        let rows: Vec<Row> = decode_rows(chunks(&["a\n", "b"]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![Some("a".to_string())], vec![Some("b".to_string())]]);
    }

    #[tokio::test]
    async fn test_decode_rows_empty_body() {
        let rows: Vec<Row> = decode_rows(chunks(&[])).try_collect().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_decode_rows_exception_after_rows() {
        let mut rows = decode_rows(chunks(&[
            "1\t10.50\n2\t7,00\n",
            "Code: 241. DB::Exception: Memory limit (total) exceeded. (MEMORY_LIMIT_EXCEEDED)\n",
        ]));

        assert_eq!(
            rows.try_next().await.unwrap(),
            Some(vec![Some("1".to_string()), Some("10.50".to_string())])
        );
        assert_eq!(
            rows.try_next().await.unwrap(),
            Some(vec![Some("2".to_string()), Some("7,00".to_string())])
        );

        let err = rows.try_next().await.unwrap_err();
        assert!(matches!(err, FlatBridgeError::QueryExecution { .. }));
        assert!(err.to_string().contains("Code: 241. DB::Exception: Memory limit"));
    }

    #[tokio::test]
    async fn test_decode_rows_exception_appended_to_partial_row() {
        let result: Result<Vec<Row>> = decode_rows(chunks(&[
            "1\ta\n2\tb",
            "Code: 60. DB::Exception: Table default.gone does not exist",
        ]))
        .try_collect()
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, FlatBridgeError::QueryExecution { .. }));
        assert!(err.to_string().contains("Code: 60. DB::Exception: Table default.gone"));
        assert!(!err.to_string().contains("2\tb"));
    }

    #[tokio::test]
    async fn test_decode_rows_plain_code_text_is_data() {
        let rows: Vec<Row> = decode_rows(chunks(&["Code: none\tDB\n"]))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![vec![Some("Code: none".to_string()), Some("DB".to_string())]]
        );
    }

    #[tokio::test]
    async fn test_decode_rows_surfaces_body_errors() {
        let body = stream::iter(vec![
            Ok(b"1\n".as_slice()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);
        let result: Result<Vec<Row>> = decode_rows(body).try_collect().await;
        assert!(result.unwrap_err().to_string().contains("reset"));
    }
}
