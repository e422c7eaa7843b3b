//! The connection handle.

use super::{ExecutionMonitor, MonotonicStopwatch, ObserverId, QueryState, StateObservers, Stopwatch};
use crate::db::{ConnectionTarget, QueryExecutor, ResultSet, ResultSink, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// A database connection that runs queries through a [`QueryExecutor`].
///
/// The connection owns every result set produced by its latest execution.
/// [`execute`](Self::execute) moves the last one out to the caller; the
/// others stay here, readable through [`result_sets`](Self::result_sets),
/// until the next execution or [`close`](Self::close).
///
/// Calls are synchronous and take `&mut self`, so one caller at a time.
pub struct Connection<E, S = MonotonicStopwatch> {
    executor: E,
    target: ConnectionTarget,
    result_sets: Vec<ResultSet>,
    timing: ExecutionMonitor<S>,
    observers: StateObservers,
}

impl<E: QueryExecutor> Connection<E> {
    /// Creates an inactive connection timed by the system clock.
    pub fn new(executor: E) -> Self {
        Self::with_stopwatch(executor, MonotonicStopwatch::new())
    }
}

impl<E: QueryExecutor, S: Stopwatch> Connection<E, S> {
    /// Creates an inactive connection timed by `stopwatch`.
    pub fn with_stopwatch(executor: E, stopwatch: S) -> Self {
        Self {
            executor,
            target: ConnectionTarget::default(),
            result_sets: Vec::new(),
            timing: ExecutionMonitor::new(stopwatch),
            observers: StateObservers::new(),
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    pub fn target_database(&self) -> Option<&str> {
        self.target.database.as_deref()
    }

    /// Switches to another database, closing first. No-op if unchanged.
    pub fn set_target_database(&mut self, database: impl Into<String>) {
        let database = database.into();
        if self.target.database.as_deref() == Some(database.as_str()) {
            return;
        }

        self.close();
        debug!(database = %database, "target database changed");
        self.target.database = Some(database);
    }

    pub fn connection_descriptor(&self) -> Option<&str> {
        self.target.descriptor.as_deref()
    }

    /// Replaces the connection descriptor. Always closes, even if unchanged.
    pub fn set_connection_descriptor(&mut self, descriptor: impl Into<String>) {
        self.close();
        self.target.descriptor = Some(descriptor.into());
    }

    pub fn query_state(&self) -> QueryState {
        self.timing.query_state()
    }

    /// Registers a callback fired after every actual state change.
    pub fn subscribe(&mut self, callback: impl FnMut() + Send + 'static) -> ObserverId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Returns a handle that reads state and elapsed time from other threads.
    pub fn monitor(&self) -> ExecutionMonitor<S> {
        self.timing.clone()
    }

    /// Runs `query` and hands the last produced result set to the caller.
    ///
    /// Returns `None` when the executor fails or produces nothing. Sets
    /// other than the returned one are kept by the connection.
    pub fn execute(&mut self, query: &str, params: &[Value]) -> Option<ResultSet> {
        if self.run(query, params) {
            self.result_sets.pop()
        } else {
            None
        }
    }

    /// Result sets still owned by the connection.
    pub fn result_sets(&self) -> &[ResultSet] {
        &self.result_sets
    }

    /// Elapsed time of the running or last completed execution.
    pub fn elapsed(&self) -> String {
        self.timing.elapsed()
    }

    pub fn elapsed_duration(&self) -> Duration {
        self.timing.elapsed_duration()
    }

    /// Releases driver resources and every owned result set.
    ///
    /// Safe to call any number of times.
    pub fn close(&mut self) {
        if let Err(e) = self.executor.close() {
            warn!(error = %e, "executor did not close cleanly");
        }
        self.set_query_state(QueryState::Inactive);
        self.clear_result_sets();
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Clears, runs, collects. Returns whether the executor succeeded.
    fn run(&mut self, query: &str, params: &[Value]) -> bool {
        self.clear_result_sets();
        self.set_query_state(QueryState::Executing);
        debug!(query, params = params.len(), "executing query");

        let mut sink = ResultSink::new(&mut self.result_sets);
        let outcome = self.executor.run(&self.target, query, params, &mut sink);

        self.set_query_state(QueryState::Inactive);

        match outcome {
            Ok(()) => {
                debug!(
                    result_sets = self.result_sets.len(),
                    elapsed = %self.timing.elapsed(),
                    "query finished"
                );
                true
            }
            Err(e) => {
                warn!(
                    category = e.category(),
                    error = %e,
                    partial_sets = self.result_sets.len(),
                    "query failed"
                );
                false
            }
        }
    }

    fn set_query_state(&mut self, state: QueryState) {
        if self.timing.transition(state) {
            self.observers.notify();
        }
    }

    fn clear_result_sets(&mut self) {
        self.result_sets.clear();
    }
}
