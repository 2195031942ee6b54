//! Rollout driver: turns an advance/rollback request into one orchestrator
//! write.
//!
//! Each request re-runs stage inference against a fresh snapshot and decides
//! from scratch: submit the version (first activation), proceed to the next
//! stage's absolute instance count, or refuse. There is no stored stage
//! counter, so a failed or abandoned request is recovered by simply calling
//! again.
//!
//! The project store lock only covers copying the plan out and writing the
//! started flag back; orchestrator I/O always runs without it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::join_all;
use hamal_core::{
    AppRollout, HistoryEntry, Project, ProjectView, RolloutAction, RolloutStatus, StageIndex,
};
use hamal_orchestrator::{AppSnapshot, Orchestrator, OrchestratorResult};
use hamal_state::ProjectStore;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::error::{RolloutError, RolloutResult};
use crate::inference::{Inference, infer};

/// What an advance request should do, decided from a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// Nothing deployed yet: hand the version spec to the orchestrator.
    Submit,
    /// Move `stage` forward by setting its cumulative instance target.
    Proceed { stage: StageIndex, instances: u32 },
    /// Every stage is done.
    Complete,
    /// The snapshot cannot be placed on a stage boundary.
    Inconsistent,
}

/// Decide the next step for `rollout` given its inference.
pub fn plan_advance(rollout: &AppRollout, snapshot: &AppSnapshot, inferred: &Inference) -> NextStep {
    match &inferred.status {
        RolloutStatus::Success => NextStep::Complete,
        RolloutStatus::Undefined => NextStep::Inconsistent,
        RolloutStatus::Created if snapshot.is_normal() => NextStep::Submit,
        // Not started, but the orchestrator is busy with something else.
        RolloutStatus::Created => NextStep::Inconsistent,
        RolloutStatus::Orchestrator(_) => match rollout.target_for(inferred.stage) {
            Some(instances) => NextStep::Proceed {
                stage: inferred.stage,
                instances,
            },
            // Last boundary reached; the orchestrator has yet to settle.
            None => NextStep::Complete,
        },
    }
}

/// Started flag as inference should see it. A rejected submit proposed
/// nothing, so the application reads as not started and the next advance
/// submits again.
fn counts_as_started(project: &str, app_id: &str, started: bool, submit_failed: bool) -> bool {
    if started && submit_failed {
        warn!(project, app = %app_id, "last submit was rejected; treating rollout as not started");
        return false;
    }
    started
}

/// Successful outcome of [`RolloutDriver::advance`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Advance {
    /// The version was submitted; the rollout has started.
    Submitted,
    /// The orchestrator was asked to run `instances` on the new version.
    Proceeded { stage: StageIndex, instances: u32 },
}

/// Drives rollouts for every project in a store. Cheap to clone.
#[derive(Clone)]
pub struct RolloutDriver {
    store: ProjectStore,
    orchestrator: Arc<dyn Orchestrator>,
    /// Advisory per-application locks; different apps never contend.
    app_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl RolloutDriver {
    pub fn new(store: ProjectStore, orchestrator: Arc<dyn Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            app_locks: Arc::default(),
        }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<dyn Orchestrator> {
        &self.orchestrator
    }

    async fn lock_app(&self, app_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .app_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(app_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    // ── Status ─────────────────────────────────────────────────────

    /// One project with live progress per application.
    pub async fn status(&self, name: &str) -> RolloutResult<ProjectView> {
        let project = self.store.get(name)?;
        Ok(self.view(project).await)
    }

    /// Every project with live progress. Order is not guaranteed.
    pub async fn list(&self) -> Vec<ProjectView> {
        join_all(self.store.list().into_iter().map(|p| self.view(p))).await
    }

    async fn view(&self, project: Project) -> ProjectView {
        let progress = join_all(project.applications.iter().map(|app| {
            let started = counts_as_started(
                &project.name,
                &app.app_id,
                project.is_started(&app.app_id),
                project.submit_failed(&app.app_id),
            );
            self.progress(&project.name, app, started)
        }))
        .await;
        ProjectView::new(project, progress)
    }

    async fn progress(
        &self,
        project: &str,
        rollout: &AppRollout,
        started: bool,
    ) -> (RolloutStatus, StageIndex) {
        let snapshot = match self.orchestrator.get_app(&rollout.app_id).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(project, app = %rollout.app_id, error = %e, "snapshot unavailable");
                None
            }
        };
        let inferred = infer(rollout, snapshot.as_ref(), started);
        (inferred.status, inferred.stage)
    }

    // ── Advance ────────────────────────────────────────────────────

    /// Start the rollout or move it to the next stage.
    pub async fn advance(&self, project: &str, app_id: &str) -> RolloutResult<Advance> {
        let _guard = self.lock_app(app_id).await;

        let record = self.store.find_rollout(project, app_id)?;
        let started = counts_as_started(project, app_id, record.started, record.submit_failed);
        let rollout = record.rollout;
        let snapshot = self.orchestrator.get_app(app_id).await?;
        let inferred = infer(&rollout, Some(&snapshot), started);

        match plan_advance(&rollout, &snapshot, &inferred) {
            NextStep::Complete => {
                info!(project, app = %app_id, stage = inferred.stage, "already fully updated");
                Err(RolloutError::AlreadyComplete)
            }
            NextStep::Inconsistent => {
                warn!(
                    project,
                    app = %app_id,
                    status = %inferred.status,
                    orchestrator_state = %snapshot.state,
                    updated = ?snapshot.updated_count(),
                    "refusing to advance from an inconsistent state"
                );
                Err(RolloutError::InconsistentState {
                    project: project.to_string(),
                    app_id: app_id.to_string(),
                    status: inferred.status.to_string(),
                    stage: inferred.stage,
                })
            }
            NextStep::Submit => {
                info!(project, app = %app_id, "submitting version to start rollout");
                let result = self
                    .orchestrator
                    .submit_version(app_id, &rollout.version_spec)
                    .await;
                self.after_write(project, app_id, RolloutAction::Submit, 0, &result);
                self.store.set_started(project, app_id, true);
                result?;
                Ok(Advance::Submitted)
            }
            NextStep::Proceed { stage, instances } => {
                info!(project, app = %app_id, stage, instances, "proceeding to next stage");
                let result = self.orchestrator.proceed_update(app_id, instances).await;
                self.after_write(project, app_id, RolloutAction::Advance, stage, &result);
                self.store.set_started(project, app_id, true);
                result?;
                Ok(Advance::Proceeded { stage, instances })
            }
        }
    }

    // ── Rollback ───────────────────────────────────────────────────

    /// Undo the most recent stage at the orchestrator.
    pub async fn rollback(&self, project: &str, app_id: &str) -> RolloutResult<()> {
        let _guard = self.lock_app(app_id).await;

        let record = self.store.find_rollout(project, app_id)?;
        let started = counts_as_started(project, app_id, record.started, record.submit_failed);
        let rollout = record.rollout;
        let snapshot = self.orchestrator.get_app(app_id).await?;
        if snapshot.proposed_version.is_none() {
            return Err(RolloutError::NothingToRollback {
                project: project.to_string(),
                app_id: app_id.to_string(),
            });
        }

        // Undefined is allowed here: backing out must work from any state.
        let inferred = infer(&rollout, Some(&snapshot), started);
        info!(project, app = %app_id, stage = inferred.stage, status = %inferred.status, "rolling back");

        let result = self.orchestrator.rollback(app_id).await;
        self.after_write(project, app_id, RolloutAction::Rollback, inferred.stage, &result);
        result?;
        // If the orchestrator dropped the proposed version, the plan reads as
        // not started again; while one remains, tasks decide the stage.
        self.store.set_started(project, app_id, false);
        Ok(())
    }

    fn after_write(
        &self,
        project: &str,
        app_id: &str,
        action: RolloutAction,
        stage: StageIndex,
        result: &OrchestratorResult<()>,
    ) {
        if let Err(e) = result {
            warn!(
                project,
                app = %app_id,
                %action,
                stage,
                transient = e.is_transient(),
                error = %e,
                "orchestrator write failed"
            );
        }
        self.store.record_history(
            project,
            HistoryEntry {
                time: Utc::now(),
                app_id: app_id.to_string(),
                action,
                stage,
                succeeded: result.is_ok(),
                error: result.as_ref().err().map(|e| e.to_string()),
            },
        );
    }
}
