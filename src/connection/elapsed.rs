//! Elapsed-time formatting.
//!
//! Under a minute the time reads as seconds (`"45.123 sec"`), under an hour
//! as `mm:ss.zzz`, and beyond that as `HH:mm:ss`. A running execution is
//! shown truncated to 100 ms with one decimal so a display refreshed every
//! ~200 ms doesn't flicker; a finished one is shown to the millisecond.

use super::QueryState;
use std::time::Duration;

/// Granularity of the live reading, in milliseconds.
pub const LIVE_GRANULARITY_MS: u64 = 100;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Formats `elapsed` the way a connection in `state` reports it.
pub fn format_elapsed(state: QueryState, elapsed: Duration) -> String {
    match state {
        QueryState::Executing => format_live(elapsed),
        QueryState::Inactive => format_frozen(elapsed),
    }
}

/// Formats a reading taken while the query is still running.
pub fn format_live(elapsed: Duration) -> String {
    let ms = millis(elapsed) / LIVE_GRANULARITY_MS * LIVE_GRANULARITY_MS;
    format_millis(ms, 1)
}

/// Formats the snapshot of a completed execution.
pub fn format_frozen(elapsed: Duration) -> String {
    format_millis(millis(elapsed), 3)
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// `precision` is the number of fractional second digits (1..=3).
fn format_millis(ms: u64, precision: u32) -> String {
    if ms < MS_PER_MINUTE {
        let fraction = (ms % MS_PER_SECOND) / 10u64.pow(3 - precision);
        return format!(
            "{}.{:0width$} sec",
            ms / MS_PER_SECOND,
            fraction,
            width = precision as usize
        );
    }

    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;

    if ms < MS_PER_HOUR {
        format!("{minutes:02}:{seconds:02}.{:03}", ms % MS_PER_SECOND)
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
