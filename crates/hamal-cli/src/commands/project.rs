use console::style;

use crate::client::ApiClient;
use crate::commands::render;

pub async fn list(client: &ApiClient) -> anyhow::Result<()> {
    let projects = client.list().await?;
    if projects.is_empty() {
        println!("No projects registered");
        return Ok(());
    }
    for project in &projects {
        let apps: Vec<String> = project.applications.iter().map(render::app_header).collect();
        println!("{}  {}", style(&project.name).bold(), apps.join(", "));
    }
    Ok(())
}

pub async fn status(client: &ApiClient, name: &str) -> anyhow::Result<()> {
    let view = client.status(name).await?;
    render::print_progress(&view);
    if !view.update_history.is_empty() {
        println!();
        println!("{}", style("History").bold());
        for entry in &view.update_history {
            println!("  {}", render::history_row(entry));
        }
    }
    Ok(())
}

pub async fn delete(client: &ApiClient, name: &str) -> anyhow::Result<()> {
    client.delete(name).await?;
    println!("Project {name} deleted");
    Ok(())
}
