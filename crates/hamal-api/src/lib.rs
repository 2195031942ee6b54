//! hamal-api — REST API for hamal.
//!
//! Thin axum layer over [`RolloutDriver`]: request binding, status-code
//! mapping and the JSON envelope. No rollout logic lives here.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/v1/hamal/ping` | Liveness |
//! | GET | `/v1/hamal/projects` | List projects with live status |
//! | POST | `/v1/hamal/projects` | Register a project |
//! | PUT | `/v1/hamal/projects` | Replace a project's plan |
//! | GET | `/v1/hamal/projects/{name}` | Project with live status |
//! | DELETE | `/v1/hamal/projects/{name}` | Delete a project |
//! | PUT | `/v1/hamal/projects/{name}/rollingupdate` | Advance one stage (`{"app_id"}`) |
//! | PUT | `/v1/hamal/projects/{name}/rollback` | Roll back one stage (`{"app_id"}`) |
//! | GET | `/v1/hamal/apps/{app_id}` | Orchestrator app passthrough |
//! | GET | `/v1/hamal/apps/{app_id}/versions` | Orchestrator version history |

pub mod handlers;

use axum::Router;
use axum::routing::{get, put};
use hamal_rollout::RolloutDriver;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub driver: RolloutDriver,
}

/// Build the complete API router.
pub fn build_router(driver: RolloutDriver) -> Router {
    let api_routes = Router::new()
        .route("/ping", get(handlers::ping))
        .route(
            "/projects",
            get(handlers::list_projects)
                .post(handlers::create_project)
                .put(handlers::update_project),
        )
        .route(
            "/projects/{name}",
            get(handlers::get_project).delete(handlers::delete_project),
        )
        .route("/projects/{name}/rollingupdate", put(handlers::rolling_update))
        .route("/projects/{name}/rollback", put(handlers::rollback))
        .route("/apps/{app_id}", get(handlers::get_app))
        .route("/apps/{app_id}/versions", get(handlers::get_app_versions))
        .with_state(ApiState { driver });

    Router::new()
        .nest("/v1/hamal", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
