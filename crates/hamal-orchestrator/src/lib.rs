//! hamal-orchestrator — the boundary to the cluster orchestrator.
//!
//! Everything here is I/O without decision logic. The rollout engine only
//! sees the [`Orchestrator`] trait; two implementations exist:
//!
//! - **`swan`** — HTTP adapter for a Swan-compatible API (reqwest).
//! - **`simulated`** — in-memory orchestrator for dry runs and tests.
//!
//! No call is retried. Every error is handed back to the caller.

pub mod client;
pub mod error;
pub mod simulated;
pub mod swan;
pub mod types;

pub use client::Orchestrator;
pub use error::{OrchestratorError, OrchestratorResult};
pub use simulated::{SimulatedOrchestrator, WriteCall};
pub use swan::SwanClient;
pub use types::{AppSnapshot, Task, Version};
