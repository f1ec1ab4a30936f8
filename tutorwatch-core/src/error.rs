//! Error types for tutorwatch-core

use thiserror::Error;

/// Errors raised by the reconciliation engine
#[derive(Error, Debug)]
pub enum CoreError {
    /// A stream frame could not be decoded into a [`crate::StreamMessage`]
    #[error("malformed stream message: {source}")]
    MalformedMessage {
        #[source]
        source: serde_json::Error,
    },

    /// Engine configuration violates an invariant
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
