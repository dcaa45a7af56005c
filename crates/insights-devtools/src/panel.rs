//! Text panel
//!
//! Plain-text rendering of the overlay: the record list on one side, live
//! metrics and detected libraries on the other.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};

use crate::overlay::Overlay;
use crate::record::EventRecord;
use crate::sampler::PerformanceSnapshot;
use crate::value::{ConsoleValue, render_value};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Local wall-clock time of an epoch-millisecond timestamp, `HH:MM:SS`
pub fn format_time(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

/// One record line, followed by its details when `expanded`
pub fn render_record(record: &EventRecord, expanded: bool) -> String {
    let marker = match (record.details().is_some(), expanded) {
        (false, _) => ' ',
        (true, false) => '+',
        (true, true) => '-',
    };
    let mut out = format!(
        "{} {:<7} [{}] {}",
        marker,
        record.kind().as_str(),
        format_time(record.timestamp()),
        record.message()
    );

    if let (true, Some(details)) = (expanded, record.details()) {
        match serde_json::to_string_pretty(details) {
            Ok(json) => {
                for line in json.lines() {
                    out.push_str("\n      ");
                    out.push_str(line);
                }
            }
            Err(err) => tracing::debug!("details not rendered: {}", err),
        }
    }
    out
}

fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Metrics column
pub fn render_metrics(snapshot: &PerformanceSnapshot, user_agent: &str, libraries: &[String]) -> String {
    let mut out = String::from("Performance Analytics\n");
    // writing to a String cannot fail
    let _ = writeln!(out, "FPS: {}", snapshot.fps);
    let _ = writeln!(out, "Used JS Heap: {}", megabytes(snapshot.memory_used));
    let _ = writeln!(out, "Total JS Heap: {}", megabytes(snapshot.memory_total));
    let _ = writeln!(
        out,
        "Mouse Position: ({}, {})",
        render_value(&ConsoleValue::Number(snapshot.pointer_position.x)),
        render_value(&ConsoleValue::Number(snapshot.pointer_position.y))
    );
    let _ = writeln!(
        out,
        "Screen Size: {}x{}",
        snapshot.viewport_size.width, snapshot.viewport_size.height
    );
    let _ = writeln!(out, "User Agent: {}", user_agent);

    out.push_str("\nThird-party Libraries\n");
    for lib in libraries {
        let _ = writeln!(out, "{}", lib);
    }
    out
}

/// Whole overlay: records, then metrics
pub fn render_panel(overlay: &Overlay) -> String {
    let mut out = overlay.with_records(|records| {
        records
            .enumerate()
            .map(|(index, record)| render_record(record, overlay.is_expanded(index)) + "\n")
            .collect::<String>()
    });
    out.push('\n');
    out.push_str(&render_metrics(
        &overlay.metrics(),
        overlay.user_agent().unwrap_or_default(),
        &overlay.third_party_libraries(),
    ));
    out
}
