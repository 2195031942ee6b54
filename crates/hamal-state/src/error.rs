//! Error types for the project store.

use thiserror::Error;

/// Result type alias for project store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during project store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("project {0} already exists")]
    AlreadyExists(String),

    #[error("project {0} does not exist")]
    NotFound(String),

    #[error("application {app_id} is not part of project {project}")]
    AppNotFound { project: String, app_id: String },
}
