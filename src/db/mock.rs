//! Mock query executor for testing.
//!
//! Provides an in-memory executor with scripted responses for tests and
//! `--mock-db` runs.

use super::{ColumnInfo, ConnectionTarget, QueryExecutor, ResultSet, ResultSink, Value};
use crate::error::{ConnError, Result};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// A scripted answer for one call to [`MockExecutor::run`].
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed after producing these sets, in order.
    Success(Vec<ResultSet>),
    /// Produce `partial`, then fail with `message`.
    Failure {
        partial: Vec<ResultSet>,
        message: String,
    },
}

impl MockResponse {
    /// A failure that produced nothing.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            partial: Vec::new(),
            message: message.into(),
        }
    }
}

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub target: ConnectionTarget,
    pub query: String,
    pub params: Vec<Value>,
}

type RunHook = Box<dyn FnMut(&RecordedCall) + Send>;

/// A mock executor that returns scripted results.
#[derive(Default)]
pub struct MockExecutor {
    responses: VecDeque<MockResponse>,
    calls: Vec<RecordedCall>,
    close_count: usize,
    on_run: Option<RunHook>,
}

impl MockExecutor {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that answers calls with `responses` in order.
    pub fn with_responses(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queues another response.
    pub fn push_response(&mut self, response: MockResponse) {
        self.responses.push_back(response);
    }

    /// Installs a hook invoked in the middle of every `run`.
    pub fn set_on_run(&mut self, hook: impl FnMut(&RecordedCall) + Send + 'static) {
        self.on_run = Some(Box::new(hook));
    }

    /// Calls observed so far.
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// Answer used when the script is exhausted.
    fn default_response(query: &str) -> MockResponse {
        let set = if query.trim_start().to_uppercase().starts_with("SELECT") {
            ResultSet::with_data(
                vec![ColumnInfo::new("result", "TEXT")],
                vec![vec![Value::String(format!("Mock result for: {query}"))]],
            )
        } else {
            ResultSet::new().with_rows_affected(0)
        };
        MockResponse::Success(vec![set.with_execution_time(Duration::from_millis(1))])
    }
}

impl QueryExecutor for MockExecutor {
    fn run(
        &mut self,
        target: &ConnectionTarget,
        query: &str,
        params: &[Value],
        results: &mut ResultSink<'_>,
    ) -> Result<()> {
        let call = RecordedCall {
            target: target.clone(),
            query: query.to_string(),
            params: params.to_vec(),
        };
        debug!(query, params = params.len(), "mock executor run");

        if let Some(hook) = self.on_run.as_mut() {
            hook(&call);
        }
        self.calls.push(call);

        let response = self
            .responses
            .pop_front()
            .unwrap_or_else(|| Self::default_response(query));

        match response {
            MockResponse::Success(sets) => {
                sets.into_iter().for_each(|set| results.push(set));
                Ok(())
            }
            MockResponse::Failure { partial, message } => {
                partial.into_iter().for_each(|set| results.push(set));
                Err(ConnError::query(message))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.close_count += 1;
        Ok(())
    }
}
