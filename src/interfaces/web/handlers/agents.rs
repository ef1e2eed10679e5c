use axum::{
    Extension, Json,
    extract::{Path, State},
};

use super::{ApiJson, ApiResult, owned_agent, owned_project};
use crate::core::agent::{self, AgentDraft, AgentPatch};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Owner;

const AGENT_OUTPUT_HISTORY: usize = 20;

pub async fn list_agents(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let agents = state.council.store.list_agents(&project_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "agents": agents })))
}

pub async fn create_agent(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(draft): ApiJson<AgentDraft>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let agent = agent::create_agent(&state.council.store, &project_id, &draft).await?;
    Ok(Json(serde_json::json!({ "success": true, "agent": agent })))
}

pub async fn seed_default_agents(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let agents = agent::seed_defaults(&state.council.store, &project_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "agents": agents })))
}

pub async fn get_agent(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let (_, agent) = owned_agent(&state, &owner, &agent_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "agent": agent })))
}

pub async fn update_agent(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(patch): ApiJson<AgentPatch>,
) -> ApiResult {
    let (_, current) = owned_agent(&state, &owner, &agent_id).await?;
    let agent = agent::update_agent(&state.council.store, &current, &patch).await?;
    Ok(Json(serde_json::json!({ "success": true, "agent": agent })))
}

pub async fn delete_agent(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let (_, current) = owned_agent(&state, &owner, &agent_id).await?;
    agent::delete_agent(&state.council.store, &current).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn run_agent(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let (project, agent) = owned_agent(&state, &owner, &agent_id).await?;
    let report = state.council.run_single_agent(&project, &agent).await?;
    Ok(Json(serde_json::json!({
        "success": report.result.error.is_none(),
        "agent_run_id": report.run.id,
        "agent_output_id": report.result.output_id,
        "output": report.result.output,
        "error": report.result.error,
        "run": report.run,
    })))
}

pub async fn agent_outputs(
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_agent(&state, &owner, &agent_id).await?;
    let outputs = state
        .council
        .store
        .list_outputs_by_agent(&agent_id, AGENT_OUTPUT_HISTORY)
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "outputs": outputs })))
}
