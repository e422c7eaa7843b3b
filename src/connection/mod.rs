//! Connection handle for dbconn.
//!
//! Tracks execution state, times executions and owns the result sets a
//! query produces.

pub mod elapsed;
mod handle;
mod monitor;
mod observers;
mod state;
mod stopwatch;

pub use handle::Connection;
pub use monitor::ExecutionMonitor;
pub use observers::{ObserverId, StateObservers};
pub use state::QueryState;
pub use stopwatch::{ManualStopwatch, MonotonicStopwatch, Stopwatch};
