//! Stage inference: maps a rollout plan and live orchestrator state to a
//! status and stage.
//!
//! Progress is never stored. It is recomputed from the orchestrator's task
//! bindings on every call, so a restarted daemon or a missed response does
//! not leave local state drifting from the cluster.
//!
//! A stage is complete when the number of tasks running the proposed
//! version equals that stage's `instances_to_update` exactly. Stage `i + 1`
//! is then "ready to begin"; `stages.len()` means every stage is done.

use hamal_core::{AppRollout, RolloutStatus, StageIndex};
use hamal_orchestrator::AppSnapshot;

/// Inferred position of one application rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    pub status: RolloutStatus,
    /// Next stage to run, in `[0, stages.len()]`.
    pub stage: StageIndex,
}

impl Inference {
    fn undefined() -> Self {
        Self {
            status: RolloutStatus::Undefined,
            stage: 0,
        }
    }
}

/// Infer status and stage. `snapshot` is `None` when the fetch failed or the
/// orchestrator does not know the application.
pub fn infer(
    rollout: &AppRollout,
    snapshot: Option<&AppSnapshot>,
    ever_started: bool,
) -> Inference {
    let Some(snapshot) = snapshot else {
        return Inference::undefined();
    };

    let Some(updated) = snapshot.updated_count() else {
        // Nothing in flight at the orchestrator.
        return if ever_started {
            Inference {
                status: RolloutStatus::Success,
                stage: rollout.stages.len(),
            }
        } else {
            Inference {
                status: RolloutStatus::Created,
                stage: 0,
            }
        };
    };

    let status = RolloutStatus::Orchestrator(snapshot.state.clone());
    let boundary = rollout
        .stages
        .iter()
        .position(|s| s.instances_to_update as usize == updated);

    match boundary {
        Some(i) => Inference {
            status,
            stage: i + 1,
        },
        // Version submitted, no stage reached yet.
        None if updated == 0 => Inference { status, stage: 0 },
        None => Inference::undefined(),
    }
}
