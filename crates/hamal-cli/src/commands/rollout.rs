use crate::client::ApiClient;
use crate::commands::render;

pub async fn advance(client: &ApiClient, name: &str, app_id: &str) -> anyhow::Result<()> {
    let data = client.advance(name, app_id).await?;
    println!("{app_id}: {}", render::describe_advance(&data));
    Ok(())
}

pub async fn rollback(client: &ApiClient, name: &str, app_id: &str) -> anyhow::Result<()> {
    client.rollback(name, app_id).await?;
    println!("{app_id}: rolled back one stage");
    Ok(())
}
