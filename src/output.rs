//! Rendering of result sets for the terminal.

use crate::db::ResultSet;
use crate::error::{ConnError, Result};
use serde::Serialize;

/// JSON document printed by `--output json`.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Sets the connection kept, in production order.
    pub retained: &'a [ResultSet],
    /// The set handed back by `execute`.
    pub result: &'a ResultSet,
    /// Formatted elapsed time.
    pub elapsed: String,
}

/// Serializes a report as pretty JSON.
pub fn render_json(report: &JsonReport<'_>) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| ConnError::internal(format!("Failed to serialize result: {e}")))
}

/// Renders a result set as an aligned text table followed by a row count.
pub fn render_table(set: &ResultSet) -> String {
    let mut out = String::new();

    if set.columns.is_empty() {
        match set.rows_affected {
            Some(n) => out.push_str(&format!("({n} rows affected)\n")),
            None => out.push_str("(no columns)\n"),
        }
        return out;
    }

    let cells: Vec<Vec<String>> = set
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let widths: Vec<usize> = set
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(col.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = set
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("{:<w$}", col.name, w = *w))
        .collect();
    out.push_str(header.join(" | ").trim_end());
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", cell, w = *w))
            .collect();
        out.push_str(line.join(" | ").trim_end());
        out.push('\n');
    }

    let noun = if set.row_count == 1 { "row" } else { "rows" };
    out.push_str(&format!("({} {noun})\n", set.row_count));

    if let Some(warning) = set.truncation_warning() {
        out.push_str(&warning);
        out.push('\n');
    }

    out
}
