//! Data model shared by the store, the wire protocol and presentation

use serde::{Deserialize, Serialize};

/// Severity of a log feed entry.
///
/// Unknown severities on the wire decode as [`LogLevel::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum LogLevel {
    #[default]
    Info,
    Error,
    Success,
    System,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Success => "success",
            Self::System => "system",
        }
    }
}

impl From<String> for LogLevel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "error" => Self::Error,
            "success" => Self::Success,
            "system" => Self::System,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the log feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Seconds since the Unix epoch
    pub timestamp: f64,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: f64) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
        }
    }
}

/// Speaker of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tutor,
    Student,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tutor => f.write_str("tutor"),
            Self::Student => f.write_str("student"),
        }
    }
}

/// A single message in the session transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn tutor(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tutor,
            content: content.into(),
        }
    }

    pub fn student(content: impl Into<String>) -> Self {
        Self {
            role: Role::Student,
            content: content.into(),
        }
    }
}

/// A level estimate in the session's estimate history.
///
/// Accepts both `{"level": 3.2, "confidence": 0.7}` and the legacy bare
/// number form (`3.2`), which carries no confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEstimate")]
pub struct LevelEstimate {
    pub level: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl LevelEstimate {
    pub fn new(level: f64, confidence: f64) -> Self {
        Self {
            level,
            confidence: Some(confidence),
        }
    }

    pub fn legacy(level: f64) -> Self {
        Self {
            level,
            confidence: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEstimate {
    Full {
        level: f64,
        #[serde(default)]
        confidence: Option<f64>,
    },
    Legacy(f64),
}

impl From<RawEstimate> for LevelEstimate {
    fn from(raw: RawEstimate) -> Self {
        match raw {
            RawEstimate::Full { level, confidence } => Self { level, confidence },
            RawEstimate::Legacy(level) => Self::legacy(level),
        }
    }
}

/// Who is being tutored, and on what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    pub topic: String,
}

impl SessionInfo {
    pub fn new(name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
        }
    }
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self::new("Student", "Ready to Learn")
    }
}

/// Which final score a marker carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    Mse,
    Tutoring,
}

/// Final scores for the session in progress, kept as display-ready strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mse: Option<String>,
    pub tutoring_score: Option<String>,
}

impl ScoreSummary {
    pub fn get(&self, kind: ScoreKind) -> Option<&str> {
        match kind {
            ScoreKind::Mse => self.mse.as_deref(),
            ScoreKind::Tutoring => self.tutoring_score.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mse.is_none() && self.tutoring_score.is_none()
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
