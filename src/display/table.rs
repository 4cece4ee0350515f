//! Table and snapshot display formatting
//!
//! Renders workbook tables and snapshot listings for terminal output.

use chrono::Utc;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::backup::BackupInfo;
use crate::models::Table;

/// Render a table with an ordinal column in front
///
/// `limit` caps the number of rows shown; the footer still counts all rows.
pub fn format_table(table: &Table, limit: Option<usize>) -> String {
    if table.columns().is_empty() {
        return format!("Table '{}' has no columns.", table.name);
    }

    let mut builder = Builder::default();

    let mut header = vec!["#".to_string()];
    header.extend(table.columns().iter().cloned());
    builder.push_record(header);

    let shown = limit.unwrap_or(usize::MAX).min(table.row_count());
    for (ordinal, record) in table.records().iter().take(shown).enumerate() {
        let mut row = vec![ordinal.to_string()];
        row.extend(record.cells.iter().map(|c| c.to_string()));
        builder.push_record(row);
    }

    let mut rendered = builder.build();
    rendered.with(Style::sharp());

    let mut output = rendered.to_string();
    output.push('\n');
    if shown < table.row_count() {
        output.push_str(&format!(
            "Showing {} of {} row(s) in '{}'",
            shown,
            table.row_count(),
            table.name
        ));
    } else {
        output.push_str(&format!("{} row(s) in '{}'", table.row_count(), table.name));
    }
    output
}

/// Render one record as column/value lines
pub fn format_record(table: &Table, ordinal: usize) -> String {
    let Some(record) = table.records().get(ordinal) else {
        return format!("No row {} in '{}'", ordinal, table.name);
    };

    let width = table.columns().iter().map(|c| c.chars().count()).max().unwrap_or(0);
    let mut output = format!("Row {} ({})\n", ordinal, record.id);
    for (column, cell) in table.columns().iter().zip(&record.cells) {
        output.push_str(&format!("  {:<width$}  {}\n", column, cell, width = width));
    }
    output
}

/// Render the snapshot listing, newest first
pub fn format_snapshot_list(snapshots: &[BackupInfo], verbose: bool) -> String {
    if snapshots.is_empty() {
        return "No snapshots found.".to_string();
    }

    let mut builder = Builder::default();
    if verbose {
        builder.push_record(["#", "File", "Label", "Created (UTC)", "Age", "Size"]);
    } else {
        builder.push_record(["#", "File", "Age", "Size"]);
    }

    let now = Utc::now();
    for (i, snapshot) in snapshots.iter().enumerate() {
        let age = format_duration(now.signed_duration_since(snapshot.created_at));
        let size = format_size(snapshot.size_bytes);
        if verbose {
            builder.push_record([
                (i + 1).to_string(),
                snapshot.filename.clone(),
                snapshot.label.clone(),
                snapshot.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                age,
                size,
            ]);
        } else {
            builder.push_record([(i + 1).to_string(), snapshot.filename.clone(), age, size]);
        }
    }

    let mut rendered = builder.build();
    rendered.with(Style::sharp());
    format!("{}\nTotal: {} snapshot(s)", rendered, snapshots.len())
}

/// Format a duration in human-readable form
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    format!("{}d", hours / 24)
}

/// Format a byte count
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
