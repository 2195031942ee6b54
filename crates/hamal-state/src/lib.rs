//! hamal-state — the project store.
//!
//! Holds every registered [`Project`](hamal_core::Project) in memory behind a
//! single exclusive lock. The lock only ever covers a map operation; callers
//! get clones and do their orchestrator I/O after it is released.
//!
//! Nothing is persisted. A restarted daemon starts empty and clients must
//! register their plans again.

pub mod error;
pub mod store;

pub use error::{StateError, StateResult};
pub use store::{ProjectStore, RolloutRecord};
