//! End-to-end regression tests for the hamald REST API.
//!
//! Drives the full router (store, driver, simulated orchestrator) through
//! `tower::ServiceExt::oneshot`, the same way a client would over HTTP.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use hamal_orchestrator::SimulatedOrchestrator;
use hamal_rollout::RolloutDriver;
use hamal_state::ProjectStore;
use serde_json::{Value, json};
use tower::ServiceExt;

fn setup() -> (Router, Arc<SimulatedOrchestrator>) {
    let sim = Arc::new(SimulatedOrchestrator::new());
    sim.register_app("web", 5, "v1");
    let driver = RolloutDriver::new(ProjectStore::new(), sim.clone());
    (hamal_api::build_router(driver), sim)
}

fn plan(name: &str) -> Value {
    json!({
        "name": name,
        "applications": [{
            "app_id": "web",
            "version_spec": {"id": "v2", "image": "web:2"},
            "stages": [
                {"instances_to_update": 2, "trigger": "manual"},
                {"instances_to_update": 5, "trigger": "manual"}
            ]
        }]
    })
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn advance(router: &Router, project: &str) -> (StatusCode, Value) {
    send(
        router,
        Method::PUT,
        &format!("/v1/hamal/projects/{project}/rollingupdate"),
        Some(json!({"app_id": "web"})),
    )
    .await
}

async fn app_status(router: &Router, project: &str) -> (String, u64) {
    let (status, body) = send(router, Method::GET, &format!("/v1/hamal/projects/{project}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let app = &body["data"]["applications"][0];
    (
        app["status"].as_str().unwrap().to_string(),
        app["current_stage"].as_u64().unwrap(),
    )
}

// ── Basics ─────────────────────────────────────────────────────

#[tokio::test]
async fn ping_returns_success() {
    let (router, _) = setup();
    let (status, body) = send(&router, Method::GET, "/v1/hamal/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "success");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (router, _) = setup();
    let (status, _) = send(&router, Method::GET, "/v1/hamal/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Project CRUD ───────────────────────────────────────────────

#[tokio::test]
async fn create_get_list_delete() {
    let (router, _) = setup();

    let (status, body) = send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], "shop");

    let (status, body) = send(&router, Method::GET, "/v1/hamal/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    assert_eq!(app_status(&router, "shop").await, ("created".to_string(), 0));

    let (status, _) = send(&router, Method::DELETE, "/v1/hamal/projects/shop", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, Method::GET, "/v1/hamal/projects/shop", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn duplicate_create_conflicts() {
    let (router, _) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    let (status, body) = send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "already_exists");
}

#[tokio::test]
async fn update_missing_project_is_not_found() {
    let (router, _) = setup();
    let (status, _) = send(&router, Method::PUT, "/v1/hamal/projects", Some(plan("shop"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_replaces_plan() {
    let (router, _) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;

    let mut replaced = plan("shop");
    replaced["applications"][0]["stages"] = json!([{"instances_to_update": 5}]);
    let (status, _) = send(&router, Method::PUT, "/v1/hamal/projects", Some(replaced)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&router, Method::GET, "/v1/hamal/projects/shop", None).await;
    let stages = body["data"]["applications"][0]["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 1);
}

#[tokio::test]
async fn malformed_body_is_invalid_param() {
    let (router, _) = setup();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/v1/hamal/projects")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "invalid_param");
}

// ── Rollout flow ───────────────────────────────────────────────

#[tokio::test]
async fn full_rollout_reaches_success() {
    let (router, sim) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;

    let (status, body) = advance(&router, "shop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "submitted");
    assert_eq!(app_status(&router, "shop").await, ("updating".to_string(), 0));

    let (status, body) = advance(&router, "shop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "proceeded");
    assert_eq!(body["data"]["instances"], 2);
    assert_eq!(app_status(&router, "shop").await, ("updating".to_string(), 1));

    let (status, body) = advance(&router, "shop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["instances"], 5);
    assert_eq!(app_status(&router, "shop").await, ("success".to_string(), 2));

    let (status, body) = advance(&router, "shop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "already fully updated");

    assert_eq!(sim.calls().len(), 3);

    let (_, body) = send(&router, Method::GET, "/v1/hamal/projects/shop", None).await;
    let history = body["data"]["update_history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|h| h["succeeded"] == true));
}

#[tokio::test]
async fn advance_requires_app_id() {
    let (router, _) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    let (status, body) = send(
        &router,
        Method::PUT,
        "/v1/hamal/projects/shop/rollingupdate",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_param");
}

#[tokio::test]
async fn advance_unknown_app_is_not_found() {
    let (router, _) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    let (status, _) = send(
        &router,
        Method::PUT,
        "/v1/hamal/projects/shop/rollingupdate",
        Some(json!({"app_id": "db"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn busy_orchestrator_is_inconsistent() {
    let (router, sim) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    sim.set_state("web", Some("scaling"));

    let (status, body) = advance(&router, "shop").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "inconsistent_state");
    assert!(sim.calls().is_empty());
}

#[tokio::test]
async fn orchestrator_rejection_surfaces_raw_body() {
    let (router, sim) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    sim.reject_next_write(409, "app web is locked by another operation");

    let (status, body) = advance(&router, "shop").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "orchestrator_error");
    assert_eq!(body["error"], "app web is locked by another operation");

    let (_, body) = send(&router, Method::GET, "/v1/hamal/projects/shop", None).await;
    let history = body["data"]["update_history"].as_array().unwrap();
    assert_eq!(history[0]["succeeded"], false);
}

// ── Rollback ───────────────────────────────────────────────────

#[tokio::test]
async fn rollback_steps_back_one_stage() {
    let (router, _) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    advance(&router, "shop").await;
    advance(&router, "shop").await;
    assert_eq!(app_status(&router, "shop").await.1, 1);

    let (status, body) = send(
        &router,
        Method::PUT,
        "/v1/hamal/projects/shop/rollback",
        Some(json!({"app_id": "web"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "success");
    assert_eq!(app_status(&router, "shop").await.1, 0);
}

#[tokio::test]
async fn rollback_before_start_conflicts() {
    let (router, _) = setup();
    send(&router, Method::POST, "/v1/hamal/projects", Some(plan("shop"))).await;
    let (status, body) = send(
        &router,
        Method::PUT,
        "/v1/hamal/projects/shop/rollback",
        Some(json!({"app_id": "web"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "nothing_to_rollback");
}

// ── Orchestrator passthrough ───────────────────────────────────

#[tokio::test]
async fn app_passthrough_returns_snapshot() {
    let (router, _) = setup();
    let (status, body) = send(&router, Method::GET, "/v1/hamal/apps/web", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "web");
    assert_eq!(body["data"]["tasks"].as_array().unwrap().len(), 5);

    let (status, body) = send(&router, Method::GET, "/v1/hamal/apps/web/versions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_app_passthrough_is_bad_gateway() {
    let (router, _) = setup();
    let (status, body) = send(&router, Method::GET, "/v1/hamal/apps/db", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "orchestrator_error");
}

// ── Multi-application projects ─────────────────────────────────

#[tokio::test]
async fn two_app_project_advances_each_app_independently() {
    let (router, sim) = setup();
    sim.register_app("worker", 2, "v1");

    let mut two_apps = plan("shop");
    two_apps["applications"]
        .as_array_mut()
        .unwrap()
        .push(json!({
            "app_id": "worker",
            "version_spec": {"id": "v2"},
            "stages": [{"instances_to_update": 2, "trigger": "auto"}]
        }));
    let (status, _) = send(&router, Method::POST, "/v1/hamal/projects", Some(two_apps)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = advance(&router, "shop").await;
    assert_eq!(body["data"]["action"], "submitted");

    let (_, body) = send(&router, Method::GET, "/v1/hamal/projects/shop", None).await;
    let worker = &body["data"]["applications"][1];
    assert_eq!(worker["app_id"], "worker");
    assert_eq!(worker["status"], "created");
    assert_eq!(worker["started"], false);

    let advance_worker = || {
        send(
            &router,
            Method::PUT,
            "/v1/hamal/projects/shop/rollingupdate",
            Some(json!({"app_id": "worker"})),
        )
    };
    let (status, body) = advance_worker().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "submitted");
    let (_, body) = advance_worker().await;
    assert_eq!(body["data"]["instances"], 2);

    // Backing web out must not disturb the finished worker.
    let (status, _) = send(
        &router,
        Method::PUT,
        "/v1/hamal/projects/shop/rollback",
        Some(json!({"app_id": "web"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&router, Method::GET, "/v1/hamal/projects/shop", None).await;
    let apps = &body["data"]["applications"];
    assert_eq!(apps[0]["status"], "created");
    assert_eq!(apps[1]["status"], "success");
    assert_eq!(apps[1]["current_stage"], 1);

    let writes = sim.calls().len();
    let (_, body) = advance_worker().await;
    assert_eq!(body["data"], "already fully updated");
    assert_eq!(sim.calls().len(), writes);
}
