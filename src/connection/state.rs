//! Execution state of a connection.

use std::fmt;

/// Whether a connection is currently running a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryState {
    /// Idle. Elapsed time is frozen at the last completed execution.
    #[default]
    Inactive,
    /// A query is running. Elapsed time is read live from the clock.
    Executing,
}

impl QueryState {
    /// Returns true while a query is running.
    pub fn is_executing(self) -> bool {
        matches!(self, Self::Executing)
    }

    /// Returns the state as a lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Executing => "executing",
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
