//! Live elapsed-time indicator for the terminal.
//!
//! Redraws a braille spinner and the connection's live elapsed time on
//! stderr while a query runs.

use crate::connection::{ExecutionMonitor, Stopwatch};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Braille spinner frames for query execution.
const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Redraw period; the live reading is truncated to 100 ms to match it.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(200);

/// Spinner line driven by an [`ExecutionMonitor`].
pub struct ProgressLine<S> {
    monitor: ExecutionMonitor<S>,
    label: String,
    tick: usize,
}

impl<S: Stopwatch> ProgressLine<S> {
    /// Creates a progress line with the given label.
    pub fn new(monitor: ExecutionMonitor<S>, label: impl Into<String>) -> Self {
        Self {
            monitor,
            label: label.into(),
            tick: 0,
        }
    }

    /// Creates a query execution progress line.
    pub fn executing(monitor: ExecutionMonitor<S>) -> Self {
        Self::new(monitor, "Executing")
    }

    /// Returns the current frame of the animation.
    pub fn frame(&self) -> &'static str {
        BRAILLE_FRAMES[self.tick % BRAILLE_FRAMES.len()]
    }

    /// Returns the display string, or None once the query is no longer running.
    pub fn display(&self) -> Option<String> {
        self.monitor
            .is_executing()
            .then(|| format!("{} {} {}", self.frame(), self.label, self.monitor.elapsed()))
    }

    /// Redraws on `out` every [`REFRESH_INTERVAL`] until `done` is set.
    pub fn run_until(&mut self, done: &AtomicBool, out: &mut impl Write) {
        let mut drawn = false;
        while !done.load(Ordering::Acquire) {
            if let Some(line) = self.display() {
                let _ = write!(out, "\r\x1b[2K{line}");
                let _ = out.flush();
                drawn = true;
            }
            self.tick += 1;
            std::thread::sleep(REFRESH_INTERVAL);
        }
        if drawn {
            let _ = write!(out, "\r\x1b[2K");
            let _ = out.flush();
        }
    }
}
