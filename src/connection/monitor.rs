//! Shared execution timing.
//!
//! The state value, the stopwatch and the frozen snapshot live behind one
//! lock so that an [`ExecutionMonitor`] held by another thread (a UI
//! refreshing every ~200 ms) can read them while `execute` blocks the owner.

use super::elapsed::format_elapsed;
use super::{QueryState, Stopwatch};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

struct Timing<S> {
    state: QueryState,
    stopwatch: S,
    frozen: Duration,
}

impl<S: Stopwatch> Timing<S> {
    fn elapsed(&self) -> Duration {
        match self.state {
            QueryState::Executing => self.stopwatch.elapsed(),
            QueryState::Inactive => self.frozen,
        }
    }
}

/// Read-only view of a connection's execution state and clock.
pub struct ExecutionMonitor<S> {
    timing: Arc<Mutex<Timing<S>>>,
}

impl<S> Clone for ExecutionMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            timing: Arc::clone(&self.timing),
        }
    }
}

impl<S: Stopwatch> ExecutionMonitor<S> {
    pub(crate) fn new(stopwatch: S) -> Self {
        Self {
            timing: Arc::new(Mutex::new(Timing {
                state: QueryState::Inactive,
                stopwatch,
                frozen: Duration::ZERO,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Timing<S>> {
        self.timing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a state change. Returns false if `next` is the current state.
    ///
    /// Entering `Executing` restarts the clock; leaving it freezes the
    /// reading.
    pub(crate) fn transition(&self, next: QueryState) -> bool {
        let mut timing = self.lock();
        if timing.state == next {
            return false;
        }

        timing.state = next;
        match next {
            QueryState::Executing => timing.stopwatch.start(),
            QueryState::Inactive => timing.frozen = timing.stopwatch.elapsed(),
        }
        debug!(state = %next, elapsed = ?timing.frozen, "query state changed");
        true
    }

    /// Current execution state.
    pub fn query_state(&self) -> QueryState {
        self.lock().state
    }

    /// Returns true while a query is running.
    pub fn is_executing(&self) -> bool {
        self.query_state().is_executing()
    }

    /// Live reading while executing, frozen snapshot otherwise.
    pub fn elapsed_duration(&self) -> Duration {
        self.lock().elapsed()
    }

    /// Elapsed time formatted for display.
    pub fn elapsed(&self) -> String {
        let timing = self.lock();
        format_elapsed(timing.state, timing.elapsed())
    }
}
