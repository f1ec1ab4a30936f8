//! Client error types

use thiserror::Error;
use tutorwatch_core::{AgentRunStatus, CoreError};

/// Errors raised while talking to the agent backend
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("{url} returned {status}: {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },

    /// The requested action does not apply in the current run status
    #[error("cannot {action} while {status}")]
    InvalidStatus {
        action: &'static str,
        status: AgentRunStatus,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
