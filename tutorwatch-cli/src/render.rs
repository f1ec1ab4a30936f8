//! Plain-text presentation of reconciled state

use chrono::{DateTime, Local};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use tutorwatch_core::{AgentRunStatus, LogEntry, Reconciler, ScoreKind, SessionInfo};

/// Formats a feed entry as `[HH:MM:SS] [level] message` in local time.
pub fn log_line(entry: &LogEntry) -> String {
    format!(
        "[{}] [{}] {}",
        clock_time(entry.timestamp),
        entry.level,
        entry.message
    )
}

fn clock_time(timestamp: f64) -> String {
    DateTime::from_timestamp_micros((timestamp * 1_000_000.0) as i64)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

pub fn session_header(info: &SessionInfo) -> String {
    format!("=== {} | {} ===", info.name, info.topic)
}

/// Shows MSE with four decimals, or the raw text when it is not a number.
pub fn mse(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => format!("{value:.4}"),
        _ => raw.to_string(),
    }
}

/// Shows a level with one decimal; zero means no estimate yet.
pub fn level(value: f64) -> String {
    if value == 0.0 {
        "-".to_string()
    } else {
        format!("{value:.1}")
    }
}

pub fn confidence(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

pub fn score_line(kind: ScoreKind, value: &str) -> String {
    match kind {
        ScoreKind::Mse => format!("Final MSE: {}", mse(value)),
        ScoreKind::Tutoring => format!("Tutoring score: {value}"),
    }
}

/// Summary table of the session in view.
pub fn summary(reconciler: &Reconciler, status: AgentRunStatus) -> String {
    let store = reconciler.store();
    let scores = store.scores();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
    ]);

    let rows = [
        ("Status", status.to_string()),
        ("Student", store.session().name.clone()),
        ("Topic", store.session().topic.clone()),
        ("Level", level(reconciler.display_level())),
        ("Confidence", confidence(store.current_confidence())),
        ("MSE", scores.mse.as_deref().map(mse).unwrap_or_else(|| "-".to_string())),
        (
            "Tutoring score",
            scores.tutoring_score.clone().unwrap_or_else(|| "-".to_string()),
        ),
        ("Turns", store.transcript().len().to_string()),
        ("Estimates", store.estimates().len().to_string()),
        ("Log entries", store.logs().len().to_string()),
    ];
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }

    table.to_string()
}
