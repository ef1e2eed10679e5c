use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::core::config::AppConfig;
use crate::core::credentials::test_cipher;
use crate::core::llm::{ChatMessage, CompletionOptions, LlmError, LlmProvider};
use crate::core::orchestrator::Council;
use crate::core::sources::SourceRegistry;
use crate::core::store::test_store;
use crate::interfaces::web::{AppState, build_api_router};

/// Analysis returns prose; synthesis returns two actions unless the project
/// description asks for a broken reply with `[no-json]`.
struct CannedLlm;

#[async_trait]
impl LlmProvider for CannedLlm {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if !options.json_mode {
            return Ok("## Summary\n\nUsers want faster booking.".to_string());
        }
        if messages[1].content.contains("[no-json]") {
            return Ok("Sorry, I can only answer in prose.".to_string());
        }
        Ok(json!({
            "actions": [
                {"title": "Cut booking steps", "description": "From 5 to 2", "justification": "Drop-off"},
                {"title": "Reminder SMS", "description": "Day-before texts", "justification": "No-shows"}
            ]
        })
        .to_string())
    }
}

pub(crate) fn test_state(api_host: &str) -> AppState {
    let council = Council::new(
        test_store(),
        Arc::new(CannedLlm),
        SourceRegistry::new(20, Duration::from_secs(2)),
        test_cipher(),
        Arc::new(AppConfig::default()),
    );
    let (log_tx, _) = tokio::sync::broadcast::channel(16);
    AppState {
        council,
        log_tx,
        api_host: api_host.to_string(),
        api_port: 17990,
    }
}

pub(crate) async fn json_request(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    };
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!({}));
    (status, json)
}

async fn create_project(app: &Router, description: &str) -> String {
    let (status, body) = json_request(
        app,
        Method::POST,
        "/api/projects",
        Some(json!({ "name": "Atlas", "description": description })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["project"]["id"].as_str().unwrap().to_string()
}

async fn seed(app: &Router, project_id: &str) -> Vec<Value> {
    let (status, body) = json_request(
        app,
        Method::POST,
        &format!("/api/projects/{}/default-agents", project_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["agents"].as_array().unwrap().clone()
}

#[tokio::test]
async fn project_crud_round() {
    let app = build_api_router(test_state("127.0.0.1"));
    let id = create_project(&app, "Clinic scheduling").await;

    let (status, body) = json_request(&app, Method::GET, "/api/projects", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"][0]["owner_id"], "local");

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/projects/{}", id),
        Some(json!({ "name": "Atlas v2", "description": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["name"], "Atlas v2");
    assert!(body["project"]["description"].is_null());

    let (status, _) = json_request(&app, Method::DELETE, &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = json_request(&app, Method::GET, &format!("/api/projects/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "error": "project not found" }));
}

#[tokio::test]
async fn blank_project_name_is_a_bad_request() {
    let app = build_api_router(test_state("127.0.0.1"));
    let (status, body) = json_request(
        &app,
        Method::POST,
        "/api/projects",
        Some(json!({ "name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Project name is required");
}

#[tokio::test]
async fn other_owners_projects_are_invisible() {
    let state = test_state("127.0.0.1");
    let foreign = state
        .council
        .store
        .create_project("alice", "Private", None, None)
        .await
        .unwrap();
    let app = build_api_router(state);

    let (status, _) = json_request(&app, Method::GET, &format!("/api/projects/{}", foreign.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/run-agents", foreign.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agent_rules_surface_as_bad_requests() {
    let app = build_api_router(test_state("127.0.0.1"));
    let project_id = create_project(&app, "").await;
    let defaults = seed(&app, &project_id).await;
    assert_eq!(defaults.len(), 7);

    let (status, body) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/default-agents", project_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Default agents already exist for this project");

    let default_id = defaults[0]["id"].as_str().unwrap();
    let (status, _) = json_request(&app, Method::DELETE, &format!("/api/agents/{}", default_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/agents", project_id),
        Some(json!({ "name": "Second chief", "type": "ceo_cpo", "system_prompt": "Decide." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/agents", project_id),
        Some(json!({ "name": "Pricing", "type": "custom", "system_prompt": "Study pricing." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let custom_id = body["agent"]["id"].as_str().unwrap().to_string();

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/agents/{}", custom_id),
        Some(json!({ "system_prompt": "Study pricing and packaging." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"]["system_prompt"], "Study pricing and packaging.");

    let (status, _) = json_request(&app, Method::DELETE, &format!("/api/agents/{}", custom_id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn single_agent_run_records_one_output() {
    let app = build_api_router(test_state("127.0.0.1"));
    let project_id = create_project(&app, "").await;
    let defaults = seed(&app, &project_id).await;
    let analyst = defaults
        .iter()
        .find(|a| a["agent_type"] == "marketing")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let chief = defaults
        .iter()
        .find(|a| a["agent_type"] == "ceo_cpo")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = json_request(&app, Method::POST, &format!("/api/agents/{}/run", analyst), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let run_id = body["agent_run_id"].as_str().unwrap().to_string();

    let (_, body) = json_request(&app, Method::GET, &format!("/api/agents/{}/outputs", analyst), None).await;
    assert_eq!(body["outputs"].as_array().unwrap().len(), 1);
    let (_, body) = json_request(&app, Method::GET, &format!("/api/runs/{}/outputs", run_id), None).await;
    assert_eq!(body["run"]["status"], "completed");
    assert_eq!(body["outputs"].as_array().unwrap().len(), 1);

    let (status, _) = json_request(&app, Method::POST, &format!("/api/agents/{}/run", chief), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn council_run_review_and_tracking_flow() {
    let app = build_api_router(test_state("127.0.0.1"));
    let project_id = create_project(&app, "Clinic scheduling").await;
    seed(&app, &project_id).await;

    let (status, body) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/run-agents", project_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["agent_outputs"].as_array().unwrap().len(), 6);
    let proposed = body["proposed_actions"].as_array().unwrap().clone();
    assert_eq!(proposed.len(), 2);

    let (_, body) = json_request(
        &app,
        Method::GET,
        &format!("/api/projects/{}/actions?status=pending", project_id),
        None,
    )
    .await;
    assert_eq!(body["actions"].as_array().unwrap().len(), 2);

    let first = proposed[0]["id"].as_str().unwrap();
    let second = proposed[1]["id"].as_str().unwrap();

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/actions/{}", first),
        Some(json!({ "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "rejection_reason is required when rejecting");

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/actions/{}", first),
        Some(json!({ "status": "rejected", "rejection_reason": "low ROI" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rejection"]["rejection_reason"], "low ROI");

    let (status, _) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/actions/{}", first),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/actions/{}", second),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tracking_id = body["tracking"]["id"].as_str().unwrap().to_string();

    let (status, _) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/tracking/{}", tracking_id),
        Some(json!({ "success_score": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/tracking/{}", tracking_id),
        Some(json!({ "status": "completed", "success_score": 3, "comments": "Fewer no-shows" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracking"]["status"], "completed");
    assert!(body["tracking"]["completed_at"].is_string());

    let (status, _) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/tracking/{}", tracking_id),
        Some(json!({ "status": "active" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = json_request(&app, Method::GET, &format!("/api/actions/{}", second), None).await;
    assert_eq!(body["action"]["status"], "accepted");
    assert_eq!(body["tracking"]["success_score"], 3);
    assert!(body["rejection"].is_null());

    let (status, body) = json_request(
        &app,
        Method::GET,
        &format!("/api/projects/{}/metrics", project_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let metrics = &body["metrics"];
    assert_eq!(metrics["approval_rate"], 50.0);
    assert_eq!(metrics["rejection_rate"], 50.0);
    assert_eq!(metrics["average_score"], 3.0);
    assert_eq!(metrics["score_distribution"]["3"], 1);
    assert_eq!(metrics["tracking"]["completed"], 1);
    assert_eq!(metrics["recent_runs"].as_array().unwrap().len(), 2);

    let (_, body) = json_request(&app, Method::GET, &format!("/api/projects/{}/runs", project_id), None).await;
    assert_eq!(body["runs"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn pipeline_failures_map_to_status_codes() {
    let app = build_api_router(test_state("127.0.0.1"));

    let lonely = create_project(&app, "").await;
    json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/agents", lonely),
        Some(json!({ "name": "Persona", "type": "user_persona", "system_prompt": "Be a user." })),
    )
    .await;
    let (status, body) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/run-agents", lonely),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CEO/CPO agent not configured");

    let broken = create_project(&app, "[no-json]").await;
    seed(&app, &broken).await;
    let (status, body) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/run-agents", broken),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "CEO synthesis failed: response contained no JSON"
    );

    let (status, body) = json_request(
        &app,
        Method::POST,
        &format!("/api/projects/{}/refresh", broken),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No connected data sources to refresh");

    let (status, _) = json_request(
        &app,
        Method::GET,
        &format!("/api/projects/{}/actions?status=maybe", broken),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn data_sources_connect_and_never_echo_credentials() {
    let app = build_api_router(test_state("127.0.0.1"));
    let project_id = create_project(&app, "").await;

    let (status, body) = json_request(&app, Method::GET, "/api/data-sources/catalog", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"].as_array().unwrap().len(), 5);
    assert_eq!(body["sources"][0]["status"], "available");

    let path = format!("/api/projects/{}/data-sources", project_id);
    let (status, body) = json_request(
        &app,
        Method::POST,
        &path,
        Some(json!({ "source_type": "jira", "access_token": "t" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "JIRA integration is coming soon");

    let (status, body) = json_request(
        &app,
        Method::POST,
        &path,
        Some(json!({ "source_type": "notion", "access_token": "secret_abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_source"]["status"], "connected");
    assert!(!body.to_string().contains("secret_abc"));
    let source_id = body["data_source"]["id"].as_str().unwrap().to_string();

    let (_, body) = json_request(&app, Method::GET, &path, None).await;
    assert_eq!(body["data_sources"].as_array().unwrap().len(), 1);
    assert!(!body.to_string().contains("secret_abc"));

    let (status, _) = json_request(
        &app,
        Method::DELETE,
        &format!("/api/data-sources/{}", source_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = json_request(&app, Method::GET, &path, None).await;
    assert!(body["data_sources"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_bodies_get_the_json_error_shape() {
    let state = test_state("127.0.0.1");
    let store = state.council.store.clone();
    let app = build_api_router(state);
    let project_id = create_project(&app, "Clinic scheduling").await;
    let action = store
        .insert_actions(
            &project_id,
            &[crate::core::store::types::NewAction {
                title: "Ship reminders".into(),
                description: "SMS reminders".into(),
                justification: "No-shows".into(),
            }],
        )
        .await
        .unwrap()
        .remove(0);

    let (status, body) = json_request(
        &app,
        Method::PATCH,
        &format!("/api/actions/{}", action.id),
        Some(json!({ "status": "archived" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(
        store.get_action(&action.id).await.unwrap().unwrap().status,
        "pending"
    );

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/projects")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}
