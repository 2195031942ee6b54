//! Orchestrator wire types.
//!
//! Only the fields the rollout engine reads are typed. Everything else the
//! orchestrator sends is kept in `extra` so passthrough endpoints return it
//! unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Live state of one application at the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    #[serde(default)]
    pub id: String,
    /// Orchestrator-defined status, e.g. `normal` or `updating`.
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub current_version: Option<Version>,
    /// Present only while a version change is in flight.
    #[serde(default)]
    pub proposed_version: Option<Version>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSnapshot {
    /// State the orchestrator reports when no update is running.
    pub const STATE_NORMAL: &'static str = "normal";

    pub fn is_normal(&self) -> bool {
        self.state == Self::STATE_NORMAL
    }

    /// Number of tasks already bound to the proposed version, if one exists.
    pub fn updated_count(&self) -> Option<usize> {
        let proposed = self.proposed_version.as_ref()?;
        Some(
            self.tasks
                .iter()
                .filter(|t| t.version_id == proposed.id)
                .count(),
        )
    }
}

/// A running instance and the version it is bound to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "versionId", default)]
    pub version_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A version definition. Only `id` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub spec: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
