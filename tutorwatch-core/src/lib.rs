//! tutorwatch-core: reconciliation engine for the tutoring-agent live monitor
//!
//! The backend emits a stream of heterogeneous events (free-text log lines,
//! full-state snapshots, and discrete turn/estimate/lifecycle events). This
//! crate folds that stream into a small set of consistent, bounded state
//! structures a presentation layer can render directly:
//!
//! - **Log feed** - [`LogRingBuffer`], bounded and oldest-first
//! - **Session view** - [`SessionStateStore`] holding transcript, estimate
//!   history, current level/confidence and final scores
//! - **Text patterns** - [`SessionBoundaryDetector`] and [`ScoreExtractor`]
//! - **Display heuristic** - [`LevelClamp`]
//! - **Wire format** - [`StreamMessage`], one variant per declared `type`
//! - **Folding** - [`Reconciler`], which applies one message at a time
//! - **Run lifecycle** - [`RunStatusMachine`] over [`AgentRunStatus`]
//!
//! Everything here is synchronous and I/O free; the client crate owns the
//! connection and feeds raw frames into a [`Reconciler`].
//!
//! # Quick Start
//!
//! ```
//! use tutorwatch_core::Reconciler;
//!
//! let mut reconciler = Reconciler::default();
//! reconciler
//!     .ingest_raw(r#"{"type":"log","level":"info","message":"Processing Ana - Fractions","timestamp":1.0}"#)
//!     .unwrap();
//!
//! assert_eq!(reconciler.store().session().name, "Ana");
//! assert_eq!(reconciler.store().logs().len(), 1);
//! ```

pub mod clamp;
pub mod config;
pub mod error;
pub mod log_buffer;
pub mod model;
pub mod patterns;
pub mod protocol;
pub mod reconciler;
pub mod status;
pub mod store;

pub use clamp::LevelClamp;
pub use config::EngineConfig;
pub use error::{CoreError, Result};
pub use log_buffer::{DEFAULT_LOG_CAPACITY, LogRingBuffer};
pub use model::{
    ChatTurn, LevelEstimate, LogEntry, LogLevel, Role, ScoreKind, ScoreSummary, SessionInfo,
};
pub use patterns::{ScoreExtractor, SessionBoundaryDetector};
pub use protocol::StreamMessage;
pub use reconciler::{Clock, Outcome, Reconciler, SystemClock};
pub use status::{AgentRunStatus, RunStatusMachine};
pub use store::SessionStateStore;
