//! Query executor abstraction for dbconn.
//!
//! A [`QueryExecutor`] is the driver that actually runs SQL. The
//! [`Connection`](crate::connection::Connection) delegates to it and only
//! manages state, timing and ownership of what it produces.

mod mock;
mod postgres;
mod types;

pub use mock::{MockExecutor, MockResponse, RecordedCall};
pub use postgres::{ExecutorSettings, PostgresExecutor};
pub use types::{ColumnInfo, ResultSet, Row, Value};

use crate::error::Result;

/// Where a connection points: a descriptor and an optional database name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Opaque descriptor telling the executor how to reach the server.
    pub descriptor: Option<String>,

    /// Logical database to use on that server.
    pub database: Option<String>,
}

/// Append-only view over the result sets of the running execution.
///
/// Executors push sets in the order statements complete; they cannot
/// inspect or remove anything already produced.
pub struct ResultSink<'a> {
    sets: &'a mut Vec<ResultSet>,
}

impl<'a> ResultSink<'a> {
    pub(crate) fn new(sets: &'a mut Vec<ResultSet>) -> Self {
        Self { sets }
    }

    /// Appends a result set.
    pub fn push(&mut self, set: ResultSet) {
        self.sets.push(set);
    }

    /// Number of sets produced so far.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns true if nothing has been produced yet.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Trait defining the interface for SQL drivers.
///
/// Calls are synchronous and blocking from the caller's perspective.
pub trait QueryExecutor {
    /// Runs `query` with positional `params` against `target`.
    ///
    /// Any number of result sets may be pushed to `results`, including on
    /// failure (sets produced before the failing statement).
    fn run(
        &mut self,
        target: &ConnectionTarget,
        query: &str,
        params: &[Value],
        results: &mut ResultSink<'_>,
    ) -> Result<()>;

    /// Releases driver-level resources. Must be safe to call repeatedly.
    fn close(&mut self) -> Result<()>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for Box<E> {
    fn run(
        &mut self,
        target: &ConnectionTarget,
        query: &str,
        params: &[Value],
        results: &mut ResultSink<'_>,
    ) -> Result<()> {
        (**self).run(target, query, params, results)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
