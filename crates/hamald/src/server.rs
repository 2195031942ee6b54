//! Server mode: wires the store, orchestrator client and driver into the
//! REST API and serves it until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hamal_core::HamalConfig;
use hamal_core::config::{OrchestratorConfig, OrchestratorKind};
use hamal_orchestrator::{Orchestrator, SimulatedOrchestrator, SwanClient};
use hamal_rollout::RolloutDriver;
use hamal_state::ProjectStore;
use tracing::{info, warn};

fn build_orchestrator(config: &OrchestratorConfig) -> anyhow::Result<Arc<dyn Orchestrator>> {
    match config.kind {
        OrchestratorKind::Swan => {
            let client = SwanClient::new(&config.address, &config.api_prefix, config.timeout())
                .context("failed to build orchestrator client")?;
            info!(
                base_url = %client.base_url(),
                timeout_secs = config.timeout_secs,
                "using swan orchestrator"
            );
            Ok(Arc::new(client))
        }
        OrchestratorKind::Simulated => {
            warn!(
                apps = config.simulated_apps.len(),
                "using simulated orchestrator; no real instances will change"
            );
            Ok(Arc::new(SimulatedOrchestrator::from_config(&config.simulated_apps)))
        }
    }
}

/// Run the daemon.
pub async fn run(config: HamalConfig) -> anyhow::Result<()> {
    info!("hamal daemon starting");

    let orchestrator = build_orchestrator(&config.orchestrator)?;
    let store = ProjectStore::new();
    let driver = RolloutDriver::new(store, orchestrator);

    let router = hamal_api::build_router(driver);
    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid listen address {:?}", config.listen))?;

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("hamal daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use hamal_core::config::SimulatedApp;

    use super::*;

    #[tokio::test]
    async fn simulated_orchestrator_is_seeded_from_config() {
        let config = OrchestratorConfig {
            kind: OrchestratorKind::Simulated,
            simulated_apps: vec![SimulatedApp {
                id: "web".to_string(),
                instances: 3,
                version: "v7".to_string(),
            }],
            ..Default::default()
        };
        let orchestrator = build_orchestrator(&config).unwrap();
        let app = orchestrator.get_app("web").await.unwrap();
        assert_eq!(app.tasks.len(), 3);
        assert_eq!(app.current_version.unwrap().id, "v7");
    }

    #[test]
    fn swan_client_accepts_bare_host_address() {
        let config = OrchestratorConfig {
            address: "swan.internal:9999".to_string(),
            ..Default::default()
        };
        assert!(build_orchestrator(&config).is_ok());
    }
}
