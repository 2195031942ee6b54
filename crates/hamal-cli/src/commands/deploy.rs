//! `hamal deploy`: register a plan, show where it stands, advance it.

use std::path::Path;

use anyhow::{Context, bail};
use console::style;
use dialoguer::Confirm;
use hamal_core::{ProjectView, RolloutStatus};
use serde_json::Value;

use crate::client::ApiClient;
use crate::commands::render;

/// Read a plan file and return it with its project name.
pub fn load_plan(path: &Path) -> anyhow::Result<(String, Value)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let plan: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let Some(name) = plan["name"].as_str().filter(|n| !n.is_empty()) else {
        bail!("{} has no project name", path.display());
    };
    Ok((name.to_string(), plan))
}

fn fully_updated(view: &ProjectView) -> bool {
    view.applications
        .iter()
        .all(|app| app.status == RolloutStatus::Success)
}

pub async fn deploy(client: &ApiClient, path: &Path, replace: bool, yes: bool) -> anyhow::Result<()> {
    let (name, plan) = load_plan(path)?;

    match client.create(&plan).await {
        Ok(_) => println!("Project {name} registered"),
        Err(e) if e.code() == Some("already_exists") => {
            if replace {
                client.update(&plan).await?;
                println!("Project {name} plan replaced");
            } else {
                println!(
                    "Project {name} exists, {}",
                    style("keeping the registered plan").dim()
                );
            }
        }
        Err(e) => return Err(e.into()),
    }

    let view = client.status(&name).await?;
    render::print_progress(&view);

    if fully_updated(&view) {
        println!("{}", style("Already fully updated").green());
        return Ok(());
    }

    if yes {
        println!("  {} (--yes flag)", style("Auto-confirmed").dim());
    } else {
        let confirm = Confirm::new()
            .with_prompt(format!("Advance {name} to the next stage?"))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirm {
            println!("Rolling update cancelled");
            return Ok(());
        }
    }

    // Applications are advanced one after another; the first failure stops.
    for app in &view.applications {
        let app_id = &app.rollout.app_id;
        let data = client
            .advance(&name, app_id)
            .await
            .with_context(|| format!("advancing {app_id} failed"))?;
        println!("{app_id}: {}", render::describe_advance(&data));
    }
    Ok(())
}
