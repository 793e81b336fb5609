//! In-memory connection double for engine tests.
//!
//! Queries are answered from rows registered per exact SQL text; every
//! statement is recorded so tests can assert on the generated SQL.

use super::{Connection, ConnectionProvider, RowStream};
use crate::error::FlatBridgeError;
use crate::models::Row;
use crate::sql::Dialect;
use crate::Result;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    results: HashMap<String, Vec<Row>>,
    queries: Vec<String>,
    executed: Vec<String>,
    acquired: usize,
    fail_execute_at: Option<usize>,
    refuse_connections: bool,
}

/// Provider handing out connections that share one recorded state.
#[derive(Clone, Default)]
pub(crate) struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers the rows returned for an exact query text.
    pub(crate) fn register(&self, sql: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .unwrap()
            .results
            .insert(sql.to_string(), rows);
    }

    /// Makes the n-th `execute` call (0-based) fail.
    pub(crate) fn fail_execute_at(&self, index: usize) {
        self.state.lock().unwrap().fail_execute_at = Some(index);
    }

    /// Makes every acquire fail as an unreachable server would.
    pub(crate) fn refuse_connections(&self) {
        self.state.lock().unwrap().refuse_connections = true;
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.state.lock().unwrap().queries.clone()
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub(crate) fn acquired(&self) -> usize {
        self.state.lock().unwrap().acquired
    }
}

#[async_trait]
impl ConnectionProvider for MockProvider {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_connections {
            return Err(FlatBridgeError::connection_rejected(
                "Connection refused (os error 111)",
            ));
        }
        state.acquired += 1;
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn default_database(&self) -> String {
        "default".to_string()
    }

    fn describe(&self) -> String {
        "mock://default".to_string()
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl Connection for MockConnection {
    fn dialect(&self) -> Dialect {
        Dialect::ClickHouse
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<RowStream<'a>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(sql.to_string());
        let rows = state.results.get(sql).cloned().ok_or_else(|| {
            FlatBridgeError::query_failed(format!("Unknown query in mock: {}", sql))
        })?;
        Ok(futures::stream::iter(rows.into_iter().map(Ok)).boxed())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let index = state.executed.len();
        if state.fail_execute_at == Some(index) {
            return Err(FlatBridgeError::query_failed(
                "Code: 62. DB::Exception: Syntax error",
            ));
        }
        state.executed.push(sql.to_string());
        Ok(())
    }
}
