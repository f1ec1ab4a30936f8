//! Folds stream messages into the session view.
//!
//! One message is applied to completion before the next; every effect lands
//! in the [`SessionStateStore`]. Discrete events also append a synthesized
//! log line so the feed reads as a complete narrative whichever schema the
//! backend speaks.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::clamp::LevelClamp;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::model::{self, ChatTurn, LevelEstimate, LogEntry, LogLevel, ScoreKind, SessionInfo};
use crate::patterns::{ScoreExtractor, SessionBoundaryDetector};
use crate::protocol::{
    CompleteData, LevelEstimateData, SessionCompleteData, SessionStartData, StartData,
    StreamMessage, TurnData,
};
use crate::store::SessionStateStore;

/// Participant name used when a `session_start` event carries no subject.
const DEFAULT_PARTICIPANT: &str = "Student";

/// Source of timestamps for synthesized log entries.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Seconds since the Unix epoch
    fn now(&self) -> f64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        model::now_secs()
    }
}

/// What applying one message changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Entry appended to the log feed
    pub logged: Option<LogEntry>,
    /// Session that replaced the previous one
    pub session_started: Option<SessionInfo>,
    /// Final scores recorded by this message
    pub scores: Vec<ScoreKind>,
    /// Transcript or estimates changed
    pub view_changed: bool,
    /// The backend reported that the whole run finished
    pub run_completed: bool,
}

/// Applies stream messages to a [`SessionStateStore`].
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: SessionStateStore,
    clamp: LevelClamp,
    clock: Arc<dyn Clock>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Reconciler {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: SessionStateStore::new(config.log_capacity),
            clamp: config.level_clamp(),
            clock,
        }
    }

    pub fn store(&self) -> &SessionStateStore {
        &self.store
    }

    /// Current level as it should be displayed, after [`LevelClamp`].
    pub fn display_level(&self) -> f64 {
        self.clamp
            .clamp(self.store.current_level(), self.store.current_confidence())
    }

    /// Clears run-scoped state ahead of a new run.
    pub fn reset_for_run_start(&mut self) {
        self.store.reset_for_run_start();
    }

    /// Decodes and applies one raw frame.
    ///
    /// A frame that fails to decode returns an error and leaves state as it was.
    pub fn ingest_raw(&mut self, raw: &str) -> Result<Outcome> {
        let message = StreamMessage::decode(raw)?;
        Ok(self.apply(message))
    }

    /// Applies one decoded message.
    pub fn apply(&mut self, message: StreamMessage) -> Outcome {
        trace!(kind = message.kind(), "Applying stream message");

        match message {
            StreamMessage::Log {
                level,
                message,
                timestamp,
            } => {
                let timestamp = timestamp.unwrap_or_else(|| self.clock.now());
                self.apply_log(LogEntry::new(level, message, timestamp))
            }
            StreamMessage::StateUpdate {
                history,
                estimates,
                current_level,
                current_confidence,
            } => {
                self.store
                    .apply_state_snapshot(history, estimates, current_level, current_confidence);
                Outcome {
                    view_changed: true,
                    ..Default::default()
                }
            }
            StreamMessage::Start { data } => self.apply_start(data),
            StreamMessage::SessionStart { data } => self.apply_session_start(data),
            StreamMessage::Turn { data } => self.apply_turn(data),
            StreamMessage::LevelEstimate { data } => self.apply_level_estimate(data),
            StreamMessage::SessionComplete { data } => self.apply_session_complete(data),
            StreamMessage::Complete { data } => self.apply_complete(data),
            StreamMessage::Unknown => {
                debug!("Ignoring stream message of unknown type");
                Outcome::default()
            }
        }
    }

    fn apply_log(&mut self, entry: LogEntry) -> Outcome {
        let mut outcome = Outcome::default();

        if let Some(info) = SessionBoundaryDetector::detect(&entry.message) {
            debug!(name = %info.name, topic = %info.topic, "Session boundary detected");
            self.store.reset_for_new_session(info.clone());
            outcome.session_started = Some(info);
            outcome.view_changed = true;
        }

        for (kind, value) in ScoreExtractor::extract(&entry.message) {
            debug!(?kind, value = %value, "Final score recorded");
            self.store.record_final_score(kind, value);
            outcome.scores.push(kind);
        }

        self.store.append_log(entry.clone());
        outcome.logged = Some(entry);
        outcome
    }

    fn apply_start(&mut self, data: StartData) -> Outcome {
        self.narrate(
            LogLevel::Success,
            format!("Agent started with set: {}", data.set_type),
        )
    }

    fn apply_session_start(&mut self, data: SessionStartData) -> Outcome {
        let name = data
            .subject
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PARTICIPANT.to_string());
        let info = SessionInfo::new(name, data.topic);
        self.store.reset_for_new_session(info.clone());

        let mut outcome = self.narrate(
            LogLevel::Info,
            format!("Starting session: {}", info.topic),
        );
        outcome.session_started = Some(info);
        outcome.view_changed = true;
        outcome
    }

    fn apply_turn(&mut self, data: TurnData) -> Outcome {
        self.store.append_turns([
            ChatTurn::tutor(data.tutor_message),
            ChatTurn::student(data.student_response),
        ]);

        let mut outcome = self.narrate(
            LogLevel::Info,
            format!("Turn {} completed", data.turn_number),
        );
        outcome.view_changed = true;
        outcome
    }

    fn apply_level_estimate(&mut self, data: LevelEstimateData) -> Outcome {
        let estimate = LevelEstimate {
            level: data.estimate,
            confidence: data.confidence,
        };
        self.store.record_estimate(estimate, data.predicted_level);

        let mut outcome = self.narrate(
            LogLevel::Info,
            format!(
                "Level estimate: {:.2} → Predicted: {}",
                data.estimate, data.predicted_level
            ),
        );
        outcome.view_changed = true;
        outcome
    }

    fn apply_session_complete(&mut self, data: SessionCompleteData) -> Outcome {
        self.narrate(
            LogLevel::Success,
            format!(
                "Session complete: {} | Final Level: {} ({:.2})",
                data.topic, data.predicted_level, data.raw_estimate
            ),
        )
    }

    fn apply_complete(&mut self, data: CompleteData) -> Outcome {
        let mut outcome = self.narrate(
            LogLevel::Success,
            format!(
                "All sessions completed! Total predictions: {}",
                data.predictions.len()
            ),
        );
        outcome.run_completed = true;
        outcome
    }

    /// Appends a synthesized feed entry describing a discrete event.
    fn narrate(&mut self, level: LogLevel, message: String) -> Outcome {
        let entry = LogEntry::new(level, message, self.clock.now());
        self.store.append_log(entry.clone());
        Outcome {
            logged: Some(entry),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScoreSummary;

    #[derive(Debug)]
    struct FixedClock(f64);

    impl Clock for FixedClock {
        fn now(&self) -> f64 {
            self.0
        }
    }

    fn reconciler() -> Reconciler {
        Reconciler::with_clock(&EngineConfig::default(), Arc::new(FixedClock(42.0)))
    }

    fn log(message: &str) -> String {
        serde_json::json!({
            "type": "log",
            "level": "info",
            "message": message,
            "timestamp": 1.0,
        })
        .to_string()
    }

    fn snapshot() -> String {
        serde_json::json!({
            "type": "state_update",
            "history": [
                {"role": "tutor", "content": "What is 1/2 + 1/4?"},
                {"role": "student", "content": "3/4"},
            ],
            "estimates": [{"level": 4.6, "confidence": 0.3}],
            "current_level": 4.6,
            "current_confidence": 0.3,
        })
        .to_string()
    }

    #[test]
    fn log_is_appended_to_feed() {
        let mut r = reconciler();
        let outcome = r.ingest_raw(&log("Connecting to API")).unwrap();

        assert_eq!(r.store().logs().len(), 1);
        assert_eq!(outcome.logged.unwrap().message, "Connecting to API");
        assert!(outcome.session_started.is_none());
    }

    #[test]
    fn boundary_message_resets_session_view() {
        let mut r = reconciler();
        r.ingest_raw(&log("Processing Zoe - Algebra")).unwrap();
        r.ingest_raw(&snapshot()).unwrap();
        r.ingest_raw(&log("FINAL_MSE_SCORE: 0.5")).unwrap();

        let outcome = r.ingest_raw(&log("Processing Ana - Fractions")).unwrap();

        let store = r.store();
        assert_eq!(store.session(), &SessionInfo::new("Ana", "Fractions"));
        assert!(store.transcript().is_empty());
        assert!(store.estimates().is_empty());
        assert_eq!(store.current_level(), 0.0);
        assert_eq!(store.current_confidence(), 0.0);
        assert_eq!(store.scores(), &ScoreSummary::default());
        assert_eq!(store.logs().len(), 4);
        assert_eq!(
            outcome.session_started,
            Some(SessionInfo::new("Ana", "Fractions"))
        );
    }

    #[test]
    fn unparseable_boundary_keeps_session_and_logs_line() {
        let mut r = reconciler();
        r.ingest_raw(&log("Processing Ana - Fractions")).unwrap();
        r.ingest_raw(&snapshot()).unwrap();

        r.ingest_raw(&log("Processing something weird")).unwrap();

        let store = r.store();
        assert_eq!(store.session(), &SessionInfo::new("Ana", "Fractions"));
        assert_eq!(store.transcript().len(), 2);
        assert_eq!(
            store.logs().last().unwrap().message,
            "Processing something weird"
        );
    }

    #[test]
    fn scores_fill_in_independently() {
        let mut r = reconciler();
        r.ingest_raw(&log("FINAL_MSE_SCORE: 0.2317")).unwrap();
        assert_eq!(r.store().scores().mse.as_deref(), Some("0.2317"));
        assert!(r.store().scores().tutoring_score.is_none());

        let outcome = r.ingest_raw(&log("FINAL_TUTORING_SCORE: 4")).unwrap();
        assert_eq!(outcome.scores, vec![ScoreKind::Tutoring]);
        assert_eq!(r.store().scores().mse.as_deref(), Some("0.2317"));
        assert_eq!(r.store().scores().tutoring_score.as_deref(), Some("4"));
    }

    #[test]
    fn state_update_replaces_view() {
        let mut r = reconciler();
        r.ingest_raw(&snapshot()).unwrap();
        r.ingest_raw(&snapshot()).unwrap();

        let store = r.store();
        assert_eq!(store.transcript().len(), 2);
        assert_eq!(store.estimates(), &[LevelEstimate::new(4.6, 0.3)]);
        assert_eq!(store.current_level(), 4.6);
        assert!(store.logs().is_empty());
    }

    #[test]
    fn display_level_is_clamped_but_history_is_raw() {
        let mut r = reconciler();
        r.ingest_raw(&snapshot()).unwrap();

        assert_eq!(r.display_level(), 3.5);
        assert_eq!(r.store().estimates()[0].level, 4.6);
        assert_eq!(r.store().current_level(), 4.6);
    }

    #[test]
    fn malformed_frame_leaves_state_untouched() {
        let mut r = reconciler();
        r.ingest_raw(&log("Processing Ana - Fractions")).unwrap();
        let before = r.store().clone();

        assert!(r.ingest_raw("{\"type\": \"log\", \"message\": ").is_err());
        assert!(r.ingest_raw(r#"{"type":"turn","data":{}}"#).is_err());
        assert_eq!(r.store(), &before);
    }

    #[test]
    fn unknown_type_is_ignored() {
        let mut r = reconciler();
        let outcome = r.ingest_raw(r#"{"type":"heartbeat"}"#).unwrap();
        assert_eq!(outcome, Outcome::default());
        assert!(r.store().logs().is_empty());
    }

    #[test]
    fn log_without_timestamp_uses_clock() {
        let mut r = reconciler();
        r.ingest_raw(r#"{"type":"log","level":"error","message":"boom"}"#)
            .unwrap();
        let entry = r.store().logs().last().unwrap();
        assert_eq!(entry.timestamp, 42.0);
        assert_eq!(entry.level, LogLevel::Error);
    }

    #[test]
    fn discrete_events_update_slices_and_narrate() {
        let mut r = reconciler();
        let events = [
            r#"{"type":"start","data":{"set_type":"mini_dev"}}"#,
            r#"{"type":"session_start","data":{"subject":"Math","topic":"Fractions"}}"#,
            r#"{"type":"turn","data":{"turn_number":1,"tutor_message":"Q1","student_response":"A1"}}"#,
            r#"{"type":"level_estimate","data":{"estimate":2.346,"predicted_level":2,"confidence":0.7}}"#,
            r#"{"type":"session_complete","data":{"topic":"Fractions","predicted_level":2,"raw_estimate":2.346}}"#,
        ];
        for event in events {
            r.ingest_raw(event).unwrap();
        }

        let store = r.store();
        assert_eq!(store.session(), &SessionInfo::new("Math", "Fractions"));
        assert_eq!(
            store.transcript(),
            &[ChatTurn::tutor("Q1"), ChatTurn::student("A1")]
        );
        assert_eq!(store.estimates(), &[LevelEstimate::new(2.346, 0.7)]);
        assert_eq!(store.current_level(), 2.0);
        assert_eq!(store.current_confidence(), 0.7);

        let messages: Vec<_> = store.logs().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Agent started with set: mini_dev",
                "Starting session: Fractions",
                "Turn 1 completed",
                "Level estimate: 2.35 → Predicted: 2",
                "Session complete: Fractions | Final Level: 2 (2.35)",
            ]
        );
        assert!(store.logs().iter().all(|e| e.timestamp == 42.0));
    }

    #[test]
    fn session_start_without_subject_uses_placeholder_name() {
        let mut r = reconciler();
        r.ingest_raw(r#"{"type":"session_start","data":{"topic":"Geometry"}}"#)
            .unwrap();
        assert_eq!(r.store().session().name, "Student");
    }

    #[test]
    fn session_start_clears_previous_turns() {
        let mut r = reconciler();
        r.ingest_raw(r#"{"type":"turn","data":{"turn_number":1,"tutor_message":"Q","student_response":"A"}}"#)
            .unwrap();
        r.ingest_raw(r#"{"type":"session_start","data":{"topic":"Next"}}"#)
            .unwrap();
        assert!(r.store().transcript().is_empty());
    }

    #[test]
    fn complete_signals_run_completion() {
        let mut r = reconciler();
        let outcome = r
            .ingest_raw(r#"{"type":"complete","data":{"predictions":[1,2,3]}}"#)
            .unwrap();
        assert!(outcome.run_completed);
        assert_eq!(
            r.store().logs().last().unwrap().message,
            "All sessions completed! Total predictions: 3"
        );
    }

    #[test]
    fn replay_is_deterministic() {
        let frames = vec![
            log("Processing Ana - Fractions"),
            snapshot(),
            log("FINAL_MSE_SCORE: 0.2"),
            log("Processing Ben - Geometry"),
            snapshot(),
            log("FINAL_TUTORING_SCORE: 3"),
        ];

        let mut first = reconciler();
        let mut second = reconciler();
        for frame in &frames {
            first.ingest_raw(frame).unwrap();
        }
        for frame in &frames {
            second.ingest_raw(frame).unwrap();
        }

        assert_eq!(first.store(), second.store());
        assert_eq!(first.store().session().name, "Ben");
        assert!(first.store().scores().mse.is_none());
        assert_eq!(first.store().scores().tutoring_score.as_deref(), Some("3"));
    }

    #[test]
    fn run_restart_then_boundary_shows_no_prior_run_state() {
        let mut r = reconciler();
        r.ingest_raw(&log("Processing Ana - Fractions")).unwrap();
        r.ingest_raw(&snapshot()).unwrap();
        r.ingest_raw(&log("FINAL_MSE_SCORE: 0.2")).unwrap();
        r.ingest_raw(&log("FINAL_TUTORING_SCORE: 4")).unwrap();

        r.reset_for_run_start();
        r.ingest_raw(&log("Processing Ben - Geometry")).unwrap();

        let store = r.store();
        assert!(store.scores().is_empty());
        assert!(store.transcript().is_empty());
        assert!(store.estimates().is_empty());
        assert_eq!(store.logs().len(), 1);
    }
}
