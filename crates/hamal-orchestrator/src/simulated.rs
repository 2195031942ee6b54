//! In-process orchestrator simulation.
//!
//! Mirrors the Swan update protocol closely enough to drive the rollout
//! engine end to end without a cluster:
//!
//! - `submit_version` makes the spec the proposed version (state `updating`).
//! - `proceed_update(n)` binds the first `n` tasks to the proposed version;
//!   reaching the full instance count promotes it and ends the update.
//! - `rollback` returns to the previous proceed target, or cancels the update
//!   when there is none.
//!
//! Every write call is recorded so tests can assert on routing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use hamal_core::config::SimulatedApp;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::Orchestrator;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::{AppSnapshot, Task, Version};

/// A write the simulation received, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    Submit { app_id: String },
    Proceed { app_id: String, instances: u32 },
    Rollback { app_id: String },
}

#[derive(Debug)]
struct SimApp {
    instances: u32,
    current: Version,
    proposed: Option<Version>,
    /// Tasks bound to the proposed version.
    updated: u32,
    /// Proceed targets reached during the current update, oldest first.
    targets: Vec<u32>,
    versions: Vec<Version>,
    /// Overrides the derived state string when set.
    state_override: Option<String>,
}

impl SimApp {
    fn snapshot(&self, id: &str) -> AppSnapshot {
        let tasks = (0..self.instances)
            .map(|i| {
                let version = match &self.proposed {
                    Some(p) if i < self.updated => &p.id,
                    _ => &self.current.id,
                };
                let mut extra = serde_json::Map::new();
                extra.insert("id".to_string(), Value::from(format!("{i}-{id}")));
                Task {
                    version_id: version.clone(),
                    extra,
                }
            })
            .collect();
        let state = match (&self.state_override, &self.proposed) {
            (Some(state), _) => state.clone(),
            (None, Some(_)) => "updating".to_string(),
            (None, None) => AppSnapshot::STATE_NORMAL.to_string(),
        };
        let mut extra = serde_json::Map::new();
        extra.insert("instances".to_string(), Value::from(self.instances));
        AppSnapshot {
            id: id.to_string(),
            state,
            tasks,
            current_version: Some(self.current.clone()),
            proposed_version: self.proposed.clone(),
            extra,
        }
    }
}

/// Thread-safe in-memory [`Orchestrator`].
#[derive(Debug, Default)]
pub struct SimulatedOrchestrator {
    apps: Mutex<HashMap<String, SimApp>>,
    calls: Mutex<Vec<WriteCall>>,
    /// Rejection returned by the next write, whatever it is.
    reject_next: Mutex<Option<(u16, String)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn rejected(status: u16, body: impl Into<String>) -> OrchestratorError {
    OrchestratorError::Rejected {
        status,
        body: body.into(),
    }
}

impl SimulatedOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a simulation seeded from daemon config.
    pub fn from_config(apps: &[SimulatedApp]) -> Self {
        let sim = Self::new();
        for app in apps {
            sim.register_app(&app.id, app.instances, &app.version);
        }
        sim
    }

    /// Add (or reset) an application with every task on `version_id`.
    pub fn register_app(&self, app_id: &str, instances: u32, version_id: &str) {
        let current = Version {
            id: version_id.to_string(),
            spec: serde_json::Map::new(),
        };
        let app = SimApp {
            instances,
            current: current.clone(),
            proposed: None,
            updated: 0,
            targets: Vec::new(),
            versions: vec![current],
            state_override: None,
        };
        lock(&self.apps).insert(app_id.to_string(), app);
        info!(app = %app_id, instances, version = %version_id, "simulated app registered");
    }

    /// Force the reported state string, e.g. to model a busy orchestrator.
    pub fn set_state(&self, app_id: &str, state: Option<&str>) {
        if let Some(app) = lock(&self.apps).get_mut(app_id) {
            app.state_override = state.map(str::to_string);
        }
    }

    /// Make the next write fail with `status` and `body`.
    pub fn reject_next_write(&self, status: u16, body: &str) {
        *lock(&self.reject_next) = Some((status, body.to_string()));
    }

    /// Writes received so far.
    pub fn calls(&self) -> Vec<WriteCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: WriteCall) -> OrchestratorResult<()> {
        debug!(?call, "simulated write");
        lock(&self.calls).push(call);
        match lock(&self.reject_next).take() {
            Some((status, body)) => Err(rejected(status, body)),
            None => Ok(()),
        }
    }
}

fn not_found(app_id: &str) -> OrchestratorError {
    rejected(404, format!("app {app_id} not found"))
}

#[async_trait]
impl Orchestrator for SimulatedOrchestrator {
    async fn get_app(&self, app_id: &str) -> OrchestratorResult<AppSnapshot> {
        let apps = lock(&self.apps);
        let app = apps.get(app_id).ok_or_else(|| not_found(app_id))?;
        Ok(app.snapshot(app_id))
    }

    async fn get_versions(&self, app_id: &str) -> OrchestratorResult<Vec<Version>> {
        let apps = lock(&self.apps);
        let app = apps.get(app_id).ok_or_else(|| not_found(app_id))?;
        Ok(app.versions.clone())
    }

    async fn submit_version(&self, app_id: &str, version_spec: &Value) -> OrchestratorResult<()> {
        self.record(WriteCall::Submit {
            app_id: app_id.to_string(),
        })?;
        let mut apps = lock(&self.apps);
        let app = apps.get_mut(app_id).ok_or_else(|| not_found(app_id))?;
        if app.proposed.is_some() {
            return Err(rejected(409, format!("app {app_id} is already updating")));
        }

        let mut spec = version_spec.as_object().cloned().unwrap_or_default();
        let id = match spec.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            _ => format!("{app_id}-v{}", app.versions.len() + 1),
        };
        let version = Version { id, spec };
        app.versions.push(version.clone());
        app.proposed = Some(version);
        app.updated = 0;
        app.targets.clear();
        Ok(())
    }

    async fn proceed_update(&self, app_id: &str, instances: u32) -> OrchestratorResult<()> {
        self.record(WriteCall::Proceed {
            app_id: app_id.to_string(),
            instances,
        })?;
        let mut apps = lock(&self.apps);
        let app = apps.get_mut(app_id).ok_or_else(|| not_found(app_id))?;
        if app.proposed.is_none() {
            return Err(rejected(409, format!("app {app_id} has no update in progress")));
        }
        if instances > app.instances {
            return Err(rejected(
                400,
                format!("instances {instances} exceeds app size {}", app.instances),
            ));
        }
        if instances < app.updated {
            return Err(rejected(
                400,
                format!("instances {instances} is below {} already updated", app.updated),
            ));
        }
        if instances == app.updated {
            // Absolute target already reached; a duplicate call converges.
            return Ok(());
        }

        app.updated = instances;
        app.targets.push(instances);
        if instances == app.instances {
            app.current = app.proposed.take().unwrap_or_default();
            app.updated = 0;
            app.targets.clear();
            info!(app = %app_id, version = %app.current.id, "simulated update completed");
        }
        Ok(())
    }

    async fn rollback(&self, app_id: &str) -> OrchestratorResult<()> {
        self.record(WriteCall::Rollback {
            app_id: app_id.to_string(),
        })?;
        let mut apps = lock(&self.apps);
        let app = apps.get_mut(app_id).ok_or_else(|| not_found(app_id))?;
        if app.proposed.is_none() {
            return Err(rejected(409, format!("app {app_id} has no update in progress")));
        }

        app.targets.pop();
        match app.targets.last() {
            Some(&previous) => app.updated = previous,
            None => {
                app.proposed = None;
                app.updated = 0;
                info!(app = %app_id, "simulated update cancelled");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_update_promotes_proposed_version() {
        let sim = SimulatedOrchestrator::new();
        sim.register_app("web", 4, "v1");

        sim.submit_version("web", &serde_json::json!({"id": "v2"}))
            .await
            .unwrap();
        let app = sim.get_app("web").await.unwrap();
        assert_eq!(app.state, "updating");
        assert_eq!(app.updated_count(), Some(0));

        sim.proceed_update("web", 1).await.unwrap();
        assert_eq!(sim.get_app("web").await.unwrap().updated_count(), Some(1));

        sim.proceed_update("web", 4).await.unwrap();
        let app = sim.get_app("web").await.unwrap();
        assert!(app.is_normal());
        assert_eq!(app.proposed_version, None);
        assert!(app.tasks.iter().all(|t| t.version_id == "v2"));
        assert_eq!(sim.get_versions("web").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rollback_steps_back_one_target() {
        let sim = SimulatedOrchestrator::new();
        sim.register_app("web", 5, "v1");
        sim.submit_version("web", &serde_json::json!({})).await.unwrap();
        sim.proceed_update("web", 2).await.unwrap();
        sim.proceed_update("web", 3).await.unwrap();

        sim.rollback("web").await.unwrap();
        assert_eq!(sim.get_app("web").await.unwrap().updated_count(), Some(2));

        sim.rollback("web").await.unwrap();
        let app = sim.get_app("web").await.unwrap();
        assert_eq!(app.proposed_version, None);
        assert!(app.tasks.iter().all(|t| t.version_id == "v1"));

        let err = sim.rollback("web").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Rejected { status: 409, .. }));
    }

    #[tokio::test]
    async fn duplicate_proceed_converges() {
        let sim = SimulatedOrchestrator::new();
        sim.register_app("web", 5, "v1");
        sim.submit_version("web", &serde_json::json!({"id": "v2"})).await.unwrap();
        sim.proceed_update("web", 2).await.unwrap();
        sim.proceed_update("web", 2).await.unwrap();
        assert_eq!(sim.get_app("web").await.unwrap().updated_count(), Some(2));
        assert_eq!(sim.calls().len(), 3);
    }

    #[tokio::test]
    async fn injected_rejection_and_unknown_app() {
        let sim = SimulatedOrchestrator::new();
        sim.register_app("web", 2, "v1");
        sim.reject_next_write(503, "swan is draining");
        let err = sim.submit_version("web", &serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "swan is draining");
        assert_eq!(sim.get_app("web").await.unwrap().proposed_version, None);

        let err = sim.get_app("db").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Rejected { status: 404, .. }));
    }
}
