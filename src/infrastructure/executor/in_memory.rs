//! In-memory query executor with canned responses

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::query::{CachedResult, Command, DbValue, QueryExecutor, RowCursor, TableRows};
use crate::domain::DomainError;
use crate::infrastructure::interceptor::ReplayCursor;

#[derive(Debug, Clone)]
enum Response {
    Result(CachedResult),
    Failure(String),
}

/// Executor answering statements from a fixed table of responses
///
/// Statements are matched on their text with cache annotations removed, so a
/// tagged and an untagged command reach the same response. Every execution is
/// counted, which makes it handy for observing cache hits.
#[derive(Debug, Default)]
pub struct InMemoryQueryExecutor {
    responses: HashMap<(String, &'static str), Response>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl InMemoryQueryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, statement: &str, rows: TableRows) -> Self {
        self.with_result(statement, CachedResult::Rows(Some(rows)))
    }

    pub fn with_scalar(self, statement: &str, value: DbValue) -> Self {
        self.with_result(statement, CachedResult::Scalar(value))
    }

    pub fn with_affected(self, statement: &str, count: u64) -> Self {
        self.with_result(statement, CachedResult::AffectedRows(count))
    }

    /// Makes every shape of `statement` fail with an execution error
    pub fn with_failure(mut self, statement: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        for shape in ["rows", "scalar", "affected_rows"] {
            self.responses.insert(
                (normalize(statement), shape),
                Response::Failure(message.clone()),
            );
        }
        self
    }

    /// Simulated latency applied to every execution
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of executions so far, failed ones included
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_result(mut self, statement: &str, result: CachedResult) -> Self {
        let shape = result.shape().as_str();
        self.responses
            .insert((normalize(statement), shape), Response::Result(result));
        self
    }

    async fn respond(&self, command: &Command, shape: &'static str) -> Result<CachedResult, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let statement = normalize(&command.statement());
        tracing::debug!(statement = %statement, shape, "Executing in-memory query");

        match self.responses.get(&(statement, shape)) {
            Some(Response::Result(result)) => Ok(result.clone()),
            Some(Response::Failure(message)) => Err(DomainError::execution(message.clone())),
            None => Err(DomainError::execution(format!(
                "No {} response registered for statement: {}",
                shape,
                normalize(&command.statement())
            ))),
        }
    }
}

fn normalize(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl QueryExecutor for InMemoryQueryExecutor {
    async fn execute_reader(&self, command: &Command) -> Result<Box<dyn RowCursor>, DomainError> {
        match self.respond(command, "rows").await? {
            CachedResult::Rows(rows) => Ok(Box::new(ReplayCursor::new(rows.unwrap_or_default()))),
            other => Err(DomainError::internal(format!(
                "Registered {} response for a reader",
                other.shape()
            ))),
        }
    }

    async fn execute_scalar(&self, command: &Command) -> Result<DbValue, DomainError> {
        match self.respond(command, "scalar").await? {
            CachedResult::Scalar(value) => Ok(value),
            other => Err(DomainError::internal(format!(
                "Registered {} response for a scalar",
                other.shape()
            ))),
        }
    }

    async fn execute_non_query(&self, command: &Command) -> Result<u64, DomainError> {
        match self.respond(command, "affected_rows").await? {
            CachedResult::AffectedRows(count) => Ok(count),
            other => Err(DomainError::internal(format!(
                "Registered {} response for a non-query",
                other.shape()
            ))),
        }
    }
}
