//! Reconciled view of the session in progress.
//!
//! Every mutation replaces a named slice wholesale or appends to a bounded
//! sequence, so applying the same input twice leaves the same state.

use crate::log_buffer::LogRingBuffer;
use crate::model::{ChatTurn, LevelEstimate, LogEntry, ScoreKind, ScoreSummary, SessionInfo};

/// The sole mutable aggregate behind the monitor's display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionStateStore {
    session: SessionInfo,
    transcript: Vec<ChatTurn>,
    estimates: Vec<LevelEstimate>,
    current_level: f64,
    current_confidence: f64,
    scores: ScoreSummary,
    logs: LogRingBuffer,
}

impl SessionStateStore {
    /// Creates an empty store whose log feed holds `log_capacity` entries.
    pub fn new(log_capacity: usize) -> Self {
        Self {
            logs: LogRingBuffer::new(log_capacity),
            ..Default::default()
        }
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn estimates(&self) -> &[LevelEstimate] {
        &self.estimates
    }

    pub fn current_level(&self) -> f64 {
        self.current_level
    }

    pub fn current_confidence(&self) -> f64 {
        self.current_confidence
    }

    pub fn scores(&self) -> &ScoreSummary {
        &self.scores
    }

    pub fn logs(&self) -> &LogRingBuffer {
        &self.logs
    }

    /// Starts a fresh session view for `info`.
    ///
    /// Transcript, estimate history, level, confidence and scores are cleared
    /// together so nothing from the previous session survives.
    pub fn reset_for_new_session(&mut self, info: SessionInfo) {
        self.clear_session_slices();
        self.scores = ScoreSummary::default();
        self.session = info;
    }

    /// Prepares for a new run: clears the log feed, scores and the session
    /// slices. Session info stays until the first boundary replaces it.
    pub fn reset_for_run_start(&mut self) {
        self.logs.clear();
        self.scores = ScoreSummary::default();
        self.clear_session_slices();
    }

    /// Replaces transcript, estimates, level and confidence with a snapshot.
    pub fn apply_state_snapshot(
        &mut self,
        transcript: Vec<ChatTurn>,
        estimates: Vec<LevelEstimate>,
        level: f64,
        confidence: f64,
    ) {
        self.transcript = transcript;
        self.estimates = estimates;
        self.current_level = level;
        self.current_confidence = confidence;
    }

    /// Sets one final score, leaving the other untouched.
    pub fn record_final_score(&mut self, kind: ScoreKind, value: impl Into<String>) {
        let value = Some(value.into());
        match kind {
            ScoreKind::Mse => self.scores.mse = value,
            ScoreKind::Tutoring => self.scores.tutoring_score = value,
        }
    }

    /// Appends turns to the current transcript.
    pub fn append_turns(&mut self, turns: impl IntoIterator<Item = ChatTurn>) {
        self.transcript.extend(turns);
    }

    /// Appends an estimate and makes `level` the current level.
    ///
    /// The current confidence only changes when the estimate carries one.
    pub fn record_estimate(&mut self, estimate: LevelEstimate, level: f64) {
        if let Some(confidence) = estimate.confidence {
            self.current_confidence = confidence;
        }
        self.current_level = level;
        self.estimates.push(estimate);
    }

    pub fn append_log(&mut self, entry: LogEntry) {
        self.logs.append(entry);
    }

    fn clear_session_slices(&mut self) {
        self.transcript.clear();
        self.estimates.clear();
        self.current_level = 0.0;
        self.current_confidence = 0.0;
    }
}
