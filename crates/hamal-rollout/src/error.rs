//! Rollout driver error types.

use hamal_core::StageIndex;
use hamal_orchestrator::OrchestratorError;
use hamal_state::StateError;
use thiserror::Error;

/// Errors returned by [`RolloutDriver`](crate::RolloutDriver) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RolloutError {
    #[error("project {0} does not exist")]
    ProjectNotFound(String),

    #[error("project {0} already exists")]
    ProjectExists(String),

    #[error("application {app_id} is not part of project {project}")]
    AppNotFound { project: String, app_id: String },

    /// Benign: every stage is done. Callers treat this as terminal success.
    #[error("already fully updated")]
    AlreadyComplete,

    #[error(
        "application {app_id} of project {project} is not on a stage boundary \
         (status {status}, stage {stage})"
    )]
    InconsistentState {
        project: String,
        app_id: String,
        status: String,
        stage: StageIndex,
    },

    #[error("application {app_id} of project {project} has no update in flight")]
    NothingToRollback { project: String, app_id: String },

    /// The orchestrator refused the call; `body` is its raw response.
    #[error("{body}")]
    Orchestrator { status: u16, body: String },

    /// The orchestrator could not be reached or answered garbage. The remote
    /// outcome is unknown; re-query status before retrying.
    #[error("orchestrator unavailable: {0}")]
    Transport(String),
}

/// Result type alias for rollout operations.
pub type RolloutResult<T> = Result<T, RolloutError>;

impl From<StateError> for RolloutError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NotFound(name) => RolloutError::ProjectNotFound(name),
            StateError::AlreadyExists(name) => RolloutError::ProjectExists(name),
            StateError::AppNotFound { project, app_id } => {
                RolloutError::AppNotFound { project, app_id }
            }
        }
    }
}

impl From<OrchestratorError> for RolloutError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::Rejected { status, body } => {
                RolloutError::Orchestrator { status, body }
            }
            other => RolloutError::Transport(other.to_string()),
        }
    }
}
