//! The orchestrator capabilities the rollout engine consumes.

use async_trait::async_trait;

use crate::error::OrchestratorResult;
use crate::types::{AppSnapshot, Version};

/// Fallible, non-retrying access to the external orchestrator.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Fetch the live state of an application.
    async fn get_app(&self, app_id: &str) -> OrchestratorResult<AppSnapshot>;

    /// Fetch the version history of an application.
    async fn get_versions(&self, app_id: &str) -> OrchestratorResult<Vec<Version>>;

    /// Submit a new version definition. This starts a rollout.
    async fn submit_version(
        &self,
        app_id: &str,
        version_spec: &serde_json::Value,
    ) -> OrchestratorResult<()>;

    /// Set the absolute number of instances that should run the proposed version.
    async fn proceed_update(&self, app_id: &str, instances: u32) -> OrchestratorResult<()>;

    /// Undo the most recent update step.
    async fn rollback(&self, app_id: &str) -> OrchestratorResult<()>;
}
