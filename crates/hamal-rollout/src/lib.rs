//! hamal rollout engine — stage inference and advancement.
//!
//! A rollout's progress is never stored. It is derived on demand from the
//! orchestrator's task bindings, and every advance or rollback request
//! decides its orchestrator call from that fresh view.
//!
//! # Components
//!
//! - **`inference`** — pure `(plan, snapshot) → (status, stage)` mapping
//! - **`driver`** — advance/rollback protocol and live project views

pub mod driver;
pub mod error;
pub mod inference;

pub use driver::{Advance, NextStep, RolloutDriver, plan_advance};
pub use error::{RolloutError, RolloutResult};
pub use inference::{Inference, infer};
