//! Error types for orchestrator calls.

use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Errors returned by an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Non-success response. `body` is the orchestrator's raw error text.
    #[error("{body}")]
    Rejected { status: u16, body: String },

    /// The client-side timeout fired; the remote outcome is unknown.
    #[error("orchestrator request timed out: {0}")]
    Timeout(String),

    #[error("orchestrator unreachable: {0}")]
    Transport(String),

    #[error("invalid orchestrator response: {0}")]
    Decode(String),
}

impl OrchestratorError {
    /// True when the request may not have reached the orchestrator at all.
    pub fn is_transient(&self) -> bool {
        matches!(self, OrchestratorError::Timeout(_) | OrchestratorError::Transport(_))
    }
}

impl From<reqwest::Error> for OrchestratorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OrchestratorError::Timeout(e.to_string())
        } else if e.is_decode() {
            OrchestratorError::Decode(e.to_string())
        } else {
            OrchestratorError::Transport(e.to_string())
        }
    }
}
