//! hamald.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HamalConfig {
    /// Address the REST API binds to.
    pub listen: String,
    pub orchestrator: OrchestratorConfig,
    pub log: LogConfig,
}

impl Default for HamalConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5099".to_string(),
            orchestrator: OrchestratorConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub kind: OrchestratorKind,
    /// Base URL of the orchestrator API.
    pub address: String,
    /// Path prefix in front of `/apps`.
    pub api_prefix: String,
    /// Client-side timeout for every orchestrator call.
    pub timeout_secs: u64,
    /// Applications seeded into the simulated orchestrator.
    pub simulated_apps: Vec<SimulatedApp>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            kind: OrchestratorKind::Swan,
            address: "http://127.0.0.1:9999".to_string(),
            api_prefix: "/v_beta".to_string(),
            timeout_secs: 10,
            simulated_apps: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorKind {
    /// Remote Swan-compatible HTTP API.
    Swan,
    /// In-process simulation, for dry runs and demos.
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatedApp {
    pub id: String,
    pub instances: u32,
    #[serde(default = "default_sim_version")]
    pub version: String,
}

fn default_sim_version() -> String {
    "v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,hamald=debug,hamal=debug".to_string(),
            json: false,
        }
    }
}

impl HamalConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HamalConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.orchestrator.timeout_secs > 0,
            "orchestrator.timeout_secs must be at least 1"
        );
        Ok(())
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
