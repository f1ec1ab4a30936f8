//! Recognizers for the ad hoc protocol carried inside free-text log lines.
//!
//! Both recognizers are pure. A miss is `None`/empty, never an error, so any
//! log text they do not understand falls through as an ordinary feed line.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ScoreKind, SessionInfo};

/// Substring that must be present before the full boundary pattern is tried.
pub const BOUNDARY_MARKER: &str = "Processing";

/// Marker announcing the final mean-squared-error score.
pub const MSE_SCORE_MARKER: &str = "FINAL_MSE_SCORE:";

/// Marker announcing the final tutoring score.
pub const TUTORING_SCORE_MARKER: &str = "FINAL_TUTORING_SCORE:";

// Name is the shortest run up to the first " - ", topic is the rest of the line.
static BOUNDARY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Processing (.*?) - (.*)").expect("boundary pattern is a valid regex")
});

/// Detects "a new tutoring session has started" in a log message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionBoundaryDetector;

impl SessionBoundaryDetector {
    /// Returns the announced session when `message` has the form
    /// `"Processing <name> - <topic>"`.
    ///
    /// Text containing the marker without the separator is not a boundary.
    pub fn detect(message: &str) -> Option<SessionInfo> {
        if !message.contains(BOUNDARY_MARKER) {
            return None;
        }

        let captures = BOUNDARY_PATTERN.captures(message)?;
        let name = captures.get(1)?.as_str();
        let topic = captures.get(2)?.as_str();
        Some(SessionInfo::new(name, topic))
    }
}

/// Extracts final scores announced in a log message.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreExtractor;

impl ScoreExtractor {
    /// Returns every score marker found in `message` with its value.
    ///
    /// The value is the text after the marker up to the next colon, trimmed.
    /// It is kept as a display string; numeric interpretation is left to
    /// presentation. A marker followed by nothing is ignored.
    pub fn extract(message: &str) -> Vec<(ScoreKind, String)> {
        [
            (ScoreKind::Mse, MSE_SCORE_MARKER),
            (ScoreKind::Tutoring, TUTORING_SCORE_MARKER),
        ]
        .into_iter()
        .filter_map(|(kind, marker)| Self::value_after(message, marker).map(|v| (kind, v)))
        .collect()
    }

    fn value_after(message: &str, marker: &str) -> Option<String> {
        let start = message.find(marker)? + marker.len();
        let value = message[start..].split(':').next()?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}
