//! Terminal rendering of project progress.

use console::style;
use hamal_core::{AppRolloutView, HistoryEntry, ProjectView, RolloutStatus};
use serde_json::Value;

/// Position of a stage relative to an application's current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMark {
    Done,
    Next,
    Pending,
}

/// One row per stage, unstyled.
pub fn stage_rows(app: &AppRolloutView) -> Vec<(StageMark, String)> {
    app.rollout
        .stages
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let n = stage.instances_to_update;
            if i < app.current_stage {
                (StageMark::Done, format!("[{i}] updated {n} instances"))
            } else if i == app.current_stage && app.status != RolloutStatus::Undefined {
                (
                    StageMark::Next,
                    format!("[{i}] pending update {n} instances ({})", stage.trigger),
                )
            } else {
                (StageMark::Pending, format!("[{i}] pending update {n} instances"))
            }
        })
        .collect()
}

pub fn app_header(app: &AppRolloutView) -> String {
    format!(
        "{} ({}, stage {}/{})",
        app.rollout.app_id,
        app.status,
        app.current_stage,
        app.rollout.stages.len()
    )
}

/// Print every application's stage list.
pub fn print_progress(view: &ProjectView) {
    println!("{}", style(format!("{} progress", view.name)).bold().cyan());
    for app in &view.applications {
        let header = app_header(app);
        match app.status {
            RolloutStatus::Undefined => println!("  {}", style(header).red()),
            RolloutStatus::Success => println!("  {}", style(header).green()),
            _ => println!("  {header}"),
        }
        for (mark, row) in stage_rows(app) {
            match mark {
                StageMark::Done => println!("     {}", style(row).blue()),
                StageMark::Next => println!("   * {}", style(row).green().bold()),
                StageMark::Pending => println!("     {}", style(row).dim()),
            }
        }
    }
}

pub fn history_row(entry: &HistoryEntry) -> String {
    let outcome = match &entry.error {
        None if entry.succeeded => "ok".to_string(),
        None => "failed".to_string(),
        Some(e) => format!("failed: {e}"),
    };
    format!(
        "{} {} {} stage {} {}",
        entry.time.format("%Y-%m-%d %H:%M:%S"),
        entry.app_id,
        entry.action,
        entry.stage,
        outcome
    )
}

/// Human description of a rollingupdate response.
pub fn describe_advance(data: &Value) -> String {
    match data {
        Value::String(msg) => msg.clone(),
        _ => match data["action"].as_str() {
            Some("submitted") => "version submitted, rollout started".to_string(),
            Some("proceeded") => format!(
                "stage {} started: {} instances on the new version",
                data["stage"], data["instances"]
            ),
            _ => data.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use hamal_core::{AppRollout, StagePolicy};
    use serde_json::json;

    use super::*;

    fn view(status: RolloutStatus, current_stage: usize) -> AppRolloutView {
        AppRolloutView {
            rollout: AppRollout::new(
                "web",
                json!({}),
                vec![StagePolicy::manual(1), StagePolicy::manual(3), StagePolicy::manual(5)],
            ),
            status,
            current_stage,
            started: current_stage > 0,
        }
    }

    fn marks(app: &AppRolloutView) -> Vec<StageMark> {
        stage_rows(app).into_iter().map(|(m, _)| m).collect()
    }

    #[test]
    fn marks_follow_current_stage() {
        let app = view(RolloutStatus::Orchestrator("updating".to_string()), 1);
        assert_eq!(
            marks(&app),
            vec![StageMark::Done, StageMark::Next, StageMark::Pending]
        );
        let rows = stage_rows(&app);
        assert_eq!(rows[0].1, "[0] updated 1 instances");
        assert_eq!(rows[1].1, "[1] pending update 3 instances (manual)");
    }

    #[test]
    fn success_marks_everything_done() {
        let app = view(RolloutStatus::Success, 3);
        assert!(marks(&app).iter().all(|m| *m == StageMark::Done));
        assert_eq!(app_header(&app), "web (success, stage 3/3)");
    }

    #[test]
    fn undefined_has_no_next_stage() {
        let app = view(RolloutStatus::Undefined, 0);
        assert!(!marks(&app).contains(&StageMark::Next));
    }

    #[test]
    fn advance_descriptions() {
        assert_eq!(
            describe_advance(&json!("already fully updated")),
            "already fully updated"
        );
        assert_eq!(
            describe_advance(&json!({"action": "submitted"})),
            "version submitted, rollout started"
        );
        assert_eq!(
            describe_advance(&json!({"action": "proceeded", "stage": 1, "instances": 3})),
            "stage 1 started: 3 instances on the new version"
        );
    }
}
