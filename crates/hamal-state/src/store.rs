//! ProjectStore: mutex-guarded in-memory project registry.
//!
//! Every operation takes the one store-wide lock for the duration of a
//! single map access and returns owned copies. No method is async, so the
//! guard can never be held across an orchestrator call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use hamal_core::{AppRollout, HistoryEntry, Project};
use tracing::debug;

use crate::error::{StateError, StateResult};

/// One application's plan as seen by the rollout driver.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloutRecord {
    pub rollout: AppRollout,
    /// A rollout of this application has been attempted.
    pub started: bool,
    /// The application's latest write was a rejected submit.
    pub submit_failed: bool,
}

/// Thread-safe project registry. Clones share the same map.
#[derive(Clone, Default)]
pub struct ProjectStore {
    projects: Arc<Mutex<HashMap<String, Project>>>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Project>> {
        // A panic elsewhere never leaves a half-written project behind:
        // every mutation is a single insert/remove/field store.
        self.projects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new project. Fails if the name is taken.
    pub fn create(&self, mut project: Project) -> StateResult<()> {
        let mut projects = self.lock();
        if projects.contains_key(&project.name) {
            return Err(StateError::AlreadyExists(project.name));
        }
        project.create_time = Utc::now();
        project.started_apps.clear();
        debug!(project = %project.name, apps = project.applications.len(), "project created");
        projects.insert(project.name.clone(), project);
        Ok(())
    }

    /// Replace an existing project's plan. History is kept; every started
    /// flag is reset because the plan itself changed.
    pub fn update(&self, mut project: Project) -> StateResult<()> {
        let mut projects = self.lock();
        let Some(existing) = projects.get_mut(&project.name) else {
            return Err(StateError::NotFound(project.name));
        };
        project.create_time = Utc::now();
        project.started_apps.clear();
        project.update_history = std::mem::take(&mut existing.update_history);
        debug!(project = %project.name, "project replaced");
        *existing = project;
        Ok(())
    }

    /// Copy of one project.
    pub fn get(&self, name: &str) -> StateResult<Project> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StateError::NotFound(name.to_string()))
    }

    /// Copies of all projects, in no particular order.
    pub fn list(&self) -> Vec<Project> {
        self.lock().values().cloned().collect()
    }

    pub fn delete(&self, name: &str) -> StateResult<()> {
        match self.lock().remove(name) {
            Some(_) => {
                debug!(project = %name, "project deleted");
                Ok(())
            }
            None => Err(StateError::NotFound(name.to_string())),
        }
    }

    /// Copy of one application's plan plus its started state.
    pub fn find_rollout(&self, name: &str, app_id: &str) -> StateResult<RolloutRecord> {
        let projects = self.lock();
        let project = projects
            .get(name)
            .ok_or_else(|| StateError::NotFound(name.to_string()))?;
        let rollout = project
            .application(app_id)
            .cloned()
            .ok_or_else(|| StateError::AppNotFound {
                project: name.to_string(),
                app_id: app_id.to_string(),
            })?;
        Ok(RolloutRecord {
            rollout,
            started: project.is_started(app_id),
            submit_failed: project.submit_failed(app_id),
        })
    }

    /// Set one application's started flag. A project deleted meanwhile is
    /// skipped.
    pub fn set_started(&self, name: &str, app_id: &str, started: bool) {
        if let Some(project) = self.lock().get_mut(name) {
            if started {
                project.started_apps.insert(app_id.to_string());
            } else {
                project.started_apps.remove(app_id);
            }
        }
    }

    /// Append to the project's update history. A project deleted meanwhile is skipped.
    pub fn record_history(&self, name: &str, entry: HistoryEntry) {
        if let Some(project) = self.lock().get_mut(name) {
            project.update_history.push(entry);
        }
    }
}
