//! Wire messages of the monitoring stream
//!
//! Two schema families share the `type` tag: the coarse `log` /
//! `state_update` pair, and discrete events (`session_start`, `turn`,
//! `level_estimate`, ...) whose payload sits under `data`. Either family may
//! appear alone or interleaved; each variant is handled on its own.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::model::{ChatTurn, LevelEstimate, LogLevel};

/// A single decoded stream message, keyed by its declared `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Free-text log line
    Log {
        #[serde(default)]
        level: LogLevel,
        message: String,
        /// Seconds since the Unix epoch; processing time is used when absent
        #[serde(default)]
        timestamp: Option<f64>,
    },

    /// Full snapshot of the session view
    StateUpdate {
        #[serde(default)]
        history: Vec<ChatTurn>,
        #[serde(default)]
        estimates: Vec<LevelEstimate>,
        #[serde(default)]
        current_level: f64,
        #[serde(default)]
        current_confidence: f64,
    },

    /// A run was started
    Start { data: StartData },

    /// A new tutoring session began
    SessionStart { data: SessionStartData },

    /// One tutor/student exchange
    Turn { data: TurnData },

    /// A new level estimate for the current student
    LevelEstimate { data: LevelEstimateData },

    /// The current session finished
    SessionComplete { data: SessionCompleteData },

    /// Every session of the run finished
    Complete {
        #[serde(default)]
        data: CompleteData,
    },

    /// Any `type` this client does not know
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartData {
    pub set_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStartData {
    /// Shown as the participant name; falls back to "Student"
    #[serde(default)]
    pub subject: Option<String>,
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnData {
    pub turn_number: u32,
    pub tutor_message: String,
    pub student_response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelEstimateData {
    /// Raw continuous estimate
    pub estimate: f64,
    /// Level the agent currently predicts
    pub predicted_level: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCompleteData {
    pub topic: String,
    pub predicted_level: f64,
    pub raw_estimate: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompleteData {
    #[serde(default)]
    pub predictions: Vec<serde_json::Value>,
}

impl StreamMessage {
    /// Decodes one frame of JSON text.
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| CoreError::MalformedMessage { source })
    }

    /// The declared `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::StateUpdate { .. } => "state_update",
            Self::Start { .. } => "start",
            Self::SessionStart { .. } => "session_start",
            Self::Turn { .. } => "turn",
            Self::LevelEstimate { .. } => "level_estimate",
            Self::SessionComplete { .. } => "session_complete",
            Self::Complete { .. } => "complete",
            Self::Unknown => "unknown",
        }
    }
}
