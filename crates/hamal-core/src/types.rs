//! Shared types used across hamal crates.
//!
//! A [`Project`] is the declarative side of a rollout: which applications
//! to update and in which stages. Live progress is never stored here; read
//! paths attach it as a [`ProjectView`] computed from orchestrator state.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique project key.
pub type ProjectName = String;

/// Application identifier as understood by the orchestrator.
pub type AppId = String;

/// Zero-based stage index. `stages.len()` means "fully rolled out".
pub type StageIndex = usize;

// ── Plan ──────────────────────────────────────────────────────────

/// A named deployment unit holding one rollout plan per application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: ProjectName,
    /// Time of the last create/update, stamped by the store.
    #[serde(default = "Utc::now", alias = "createtime")]
    pub create_time: DateTime<Utc>,
    #[serde(default)]
    pub applications: Vec<AppRollout>,
    /// Applications whose rollout has been attempted. Owned by the server.
    #[serde(default)]
    pub started_apps: BTreeSet<AppId>,
    #[serde(default)]
    pub update_history: Vec<HistoryEntry>,
}

impl Project {
    pub fn new(name: &str, applications: Vec<AppRollout>) -> Self {
        Self {
            name: name.to_string(),
            create_time: Utc::now(),
            applications,
            started_apps: BTreeSet::new(),
            update_history: Vec::new(),
        }
    }

    /// Find the plan for `app_id`.
    pub fn application(&self, app_id: &str) -> Option<&AppRollout> {
        self.applications.iter().find(|a| a.app_id == app_id)
    }

    pub fn is_started(&self, app_id: &str) -> bool {
        self.started_apps.contains(app_id)
    }

    /// True when the latest write for `app_id` was a submit the orchestrator
    /// did not accept, so the version may never have been proposed.
    pub fn submit_failed(&self, app_id: &str) -> bool {
        self.update_history
            .iter()
            .rev()
            .find(|h| h.app_id == app_id)
            .is_some_and(|h| h.action == RolloutAction::Submit && !h.succeeded)
    }
}

/// Rollout plan for a single application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppRollout {
    pub app_id: AppId,
    /// Full version definition handed to the orchestrator on first deploy.
    #[serde(default, alias = "app")]
    pub version_spec: serde_json::Value,
    #[serde(default, alias = "rolling_update_policy")]
    pub stages: Vec<StagePolicy>,
}

impl AppRollout {
    pub fn new(app_id: &str, version_spec: serde_json::Value, stages: Vec<StagePolicy>) -> Self {
        Self {
            app_id: app_id.to_string(),
            version_spec,
            stages,
        }
    }

    /// Cumulative instance target of `stage`, if the plan has that stage.
    pub fn target_for(&self, stage: StageIndex) -> Option<u32> {
        self.stages.get(stage).map(|s| s.instances_to_update)
    }
}

/// One step of a rollout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StagePolicy {
    /// Cumulative count of instances on the new version once this stage is done.
    pub instances_to_update: u32,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_policy: Option<RollbackPolicy>,
}

impl StagePolicy {
    pub fn manual(instances_to_update: u32) -> Self {
        Self {
            instances_to_update,
            trigger: Trigger::Manual,
            rollback_policy: None,
        }
    }
}

/// Who may start a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// An operator must call advance.
    #[default]
    Manual,
    /// A script may call advance unattended.
    #[serde(alias = "auto")]
    Automatic,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Manual => f.write_str("manual"),
            Trigger::Automatic => f.write_str("automatic"),
        }
    }
}

/// Thresholds for an external auto-rollback watcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    #[serde(default)]
    pub auto_rollback: bool,
    #[serde(default)]
    pub rollback_condition: u64,
}

// ── History ───────────────────────────────────────────────────────

/// Orchestrator write issued on behalf of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutAction {
    /// First activation: the version spec was submitted.
    Submit,
    /// Proceed to the next stage's instance count.
    Advance,
    Rollback,
}

impl fmt::Display for RolloutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RolloutAction::Submit => f.write_str("submit"),
            RolloutAction::Advance => f.write_str("advance"),
            RolloutAction::Rollback => f.write_str("rollback"),
        }
    }
}

/// One attempted orchestrator write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub app_id: AppId,
    pub action: RolloutAction,
    /// Stage inferred right before the write.
    pub stage: StageIndex,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Live status ───────────────────────────────────────────────────

/// Derived status of one application rollout.
///
/// Serialized as a plain string: `created`, `success`, `undefined`, or the
/// orchestrator's own state while a version is in flight. An orchestrator
/// state that collides with one of the reserved names is written as
/// `orchestrator:<state>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RolloutStatus {
    /// Plan registered, nothing deployed yet.
    Created,
    /// Every stage satisfied and the orchestrator settled.
    Success,
    /// Progress cannot be placed on a stage boundary.
    Undefined,
    /// A version is in flight; carries the orchestrator state.
    Orchestrator(String),
}

impl RolloutStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RolloutStatus::Created => "created",
            RolloutStatus::Success => "success",
            RolloutStatus::Undefined => "undefined",
            RolloutStatus::Orchestrator(state) => state,
        }
    }
}

const ORCHESTRATOR_TAG: &str = "orchestrator:";

impl From<String> for RolloutStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => RolloutStatus::Created,
            "success" => RolloutStatus::Success,
            "undefined" => RolloutStatus::Undefined,
            _ => match s.strip_prefix(ORCHESTRATOR_TAG) {
                Some(state) => RolloutStatus::Orchestrator(state.to_string()),
                None => RolloutStatus::Orchestrator(s),
            },
        }
    }
}

impl From<RolloutStatus> for String {
    fn from(status: RolloutStatus) -> Self {
        match status {
            RolloutStatus::Orchestrator(state)
                if matches!(state.as_str(), "created" | "success" | "undefined")
                    || state.starts_with(ORCHESTRATOR_TAG) =>
            {
                format!("{ORCHESTRATOR_TAG}{state}")
            }
            RolloutStatus::Orchestrator(state) => state,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for RolloutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project as returned to callers, with live progress per application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectView {
    pub name: ProjectName,
    pub create_time: DateTime<Utc>,
    /// Any application of the project has been started.
    pub in_progress: bool,
    pub applications: Vec<AppRolloutView>,
    #[serde(default)]
    pub update_history: Vec<HistoryEntry>,
}

/// An application plan plus its inferred status and stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppRolloutView {
    #[serde(flatten)]
    pub rollout: AppRollout,
    pub status: RolloutStatus,
    pub current_stage: StageIndex,
    /// A rollout of this application has been attempted.
    #[serde(default)]
    pub started: bool,
}

impl ProjectView {
    /// Attach live progress to a stored project, one entry per application.
    pub fn new(project: Project, progress: Vec<(RolloutStatus, StageIndex)>) -> Self {
        let started_apps = project.started_apps;
        let applications = project
            .applications
            .into_iter()
            .zip(progress)
            .map(|(rollout, (status, current_stage))| AppRolloutView {
                started: started_apps.contains(&rollout.app_id),
                rollout,
                status,
                current_stage,
            })
            .collect();
        Self {
            name: project.name,
            create_time: project.create_time,
            in_progress: !started_apps.is_empty(),
            applications,
            update_history: project.update_history,
        }
    }
}
