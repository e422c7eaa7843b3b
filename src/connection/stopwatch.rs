//! Stopwatches used to time executions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A resettable elapsed-time source.
pub trait Stopwatch: Send {
    /// Resets to zero and starts running.
    fn start(&mut self);

    /// Resets to zero and stops.
    fn reset(&mut self);

    /// Time since the last `start`, or zero if not running.
    fn elapsed(&self) -> Duration;
}

/// Stopwatch backed by the monotonic system clock.
#[derive(Debug, Clone, Default)]
pub struct MonotonicStopwatch {
    started: Option<Instant>,
}

impl MonotonicStopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true between `start` and `reset`.
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }
}

impl Stopwatch for MonotonicStopwatch {
    fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn reset(&mut self) {
        self.started = None;
    }

    fn elapsed(&self) -> Duration {
        self.started
            .map(|started| started.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

/// Stopwatch whose time only moves when told to.
///
/// Clones share the same reading, so a test can keep one handle and give
/// the other to a connection.
#[derive(Debug, Clone, Default)]
pub struct ManualStopwatch {
    elapsed_ms: Arc<AtomicU64>,
}

impl ManualStopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the reading forward.
    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Sets the reading to an exact value.
    pub fn set(&self, to: Duration) {
        self.elapsed_ms
            .store(to.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Stopwatch for ManualStopwatch {
    fn start(&mut self) {
        self.elapsed_ms.store(0, Ordering::SeqCst);
    }

    fn reset(&mut self) {
        self.elapsed_ms.store(0, Ordering::SeqCst);
    }

    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }
}
