use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use super::{ApiResult, owned_project, owned_run};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Owner;

const DEFAULT_RUN_PAGE: usize = 20;
const MAX_RUN_PAGE: usize = 100;

#[derive(Deserialize)]
pub struct RunListQuery {
    pub limit: Option<usize>,
}

pub async fn run_all(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let project = owned_project(&state, &owner, &project_id).await?;
    let report = state.council.run_all(&project).await?;
    Ok(Json(serde_json::json!({
        "success": report.failed == 0,
        "agent_run_id": report.run.id,
        "summary": report.summary(),
        "results": report.results,
    })))
}

pub async fn run_with_synthesis(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let project = owned_project(&state, &owner, &project_id).await?;
    let report = state.council.run_with_synthesis(&project).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "agent_run_id": report.analysis.run.id,
        "synthesis_run_id": report.synthesis.run.id,
        "summary": report.analysis.summary(),
        "agent_outputs": report.analysis.results,
        "proposed_actions": report.synthesis.actions,
    })))
}

pub async fn refresh_data(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let project = owned_project(&state, &owner, &project_id).await?;
    let report = state.council.refresh_data(&project).await?;
    Ok(Json(serde_json::json!({
        "success": report.run.error_message.is_none(),
        "run": report.run,
        "sources": report.sources,
    })))
}

pub async fn list_runs(
    Path(project_id): Path<String>,
    Query(query): Query<RunListQuery>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let limit = query.limit.unwrap_or(DEFAULT_RUN_PAGE).clamp(1, MAX_RUN_PAGE);
    let runs = state.council.store.list_runs(&project_id, limit).await?;
    Ok(Json(serde_json::json!({ "success": true, "runs": runs })))
}

pub async fn run_outputs(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let run = owned_run(&state, &owner, &run_id).await?;
    let outputs = state.council.store.list_outputs_by_run(&run_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "run": run, "outputs": outputs })))
}
