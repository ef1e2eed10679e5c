pub mod actions;
pub mod agents;
pub mod metrics;
pub mod projects;
pub mod runs;
pub mod sources;

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::AppState;
use super::auth::Owner;
use crate::core::error::CouncilError;
use crate::core::store::types::{
    ActionRecord, AgentRecord, DataSourceRecord, ProjectRecord, RunRecord, TrackingRecord,
};

/// Handler error. Renders as `{"success": false, "error": "..."}` with a
/// status derived from the domain error.
#[derive(Debug)]
pub struct ApiError(pub CouncilError);

impl From<CouncilError> for ApiError {
    fn from(e: CouncilError) -> Self {
        ApiError(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError(CouncilError::Internal(e))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CouncilError::Validation(_) | CouncilError::Configuration(_) => StatusCode::BAD_REQUEST,
            CouncilError::NotFound(_) => StatusCode::NOT_FOUND,
            CouncilError::InvalidTransition { .. } => StatusCode::CONFLICT,
            CouncilError::Synthesis(_) | CouncilError::Model(_) => StatusCode::BAD_GATEWAY,
            CouncilError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            CouncilError::Configuration(msg) => msg.clone(),
            CouncilError::Synthesis(msg) => format!("CEO synthesis failed: {}", msg),
            CouncilError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "success": false, "error": self.message() });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult = Result<Json<serde_json::Value>, ApiError>;

/// JSON body extractor. Malformed bodies answer like any other validation
/// error instead of axum's plain-text rejection.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(CouncilError::Validation(rejection.body_text()))
    }
}

// Ownership checks. Anything the caller does not own reads as not found.

pub(crate) async fn owned_project(
    state: &AppState,
    owner: &Owner,
    project_id: &str,
) -> Result<ProjectRecord, ApiError> {
    match state.council.store.get_project(project_id).await? {
        Some(project) if project.owner_id == owner.0 => Ok(project),
        _ => Err(CouncilError::NotFound("project").into()),
    }
}

pub(crate) async fn owned_agent(
    state: &AppState,
    owner: &Owner,
    agent_id: &str,
) -> Result<(ProjectRecord, AgentRecord), ApiError> {
    let agent = state
        .council
        .store
        .get_agent(agent_id)
        .await?
        .ok_or(CouncilError::NotFound("agent"))?;
    let project = owned_project(state, owner, &agent.project_id)
        .await
        .map_err(|_| CouncilError::NotFound("agent"))?;
    Ok((project, agent))
}

pub(crate) async fn owned_run(
    state: &AppState,
    owner: &Owner,
    run_id: &str,
) -> Result<RunRecord, ApiError> {
    let run = state
        .council
        .store
        .get_run(run_id)
        .await?
        .ok_or(CouncilError::NotFound("run"))?;
    owned_project(state, owner, &run.project_id)
        .await
        .map_err(|_| CouncilError::NotFound("run"))?;
    Ok(run)
}

pub(crate) async fn owned_action(
    state: &AppState,
    owner: &Owner,
    action_id: &str,
) -> Result<ActionRecord, ApiError> {
    let action = state
        .council
        .store
        .get_action(action_id)
        .await?
        .ok_or(CouncilError::NotFound("action"))?;
    owned_project(state, owner, &action.project_id)
        .await
        .map_err(|_| CouncilError::NotFound("action"))?;
    Ok(action)
}

pub(crate) async fn owned_tracking(
    state: &AppState,
    owner: &Owner,
    tracking_id: &str,
) -> Result<TrackingRecord, ApiError> {
    let tracking = state
        .council
        .store
        .get_tracking(tracking_id)
        .await?
        .ok_or(CouncilError::NotFound("tracking"))?;
    owned_action(state, owner, &tracking.proposed_action_id)
        .await
        .map_err(|_| CouncilError::NotFound("tracking"))?;
    Ok(tracking)
}

pub(crate) async fn owned_source(
    state: &AppState,
    owner: &Owner,
    source_id: &str,
) -> Result<DataSourceRecord, ApiError> {
    let source = state
        .council
        .store
        .get_data_source(source_id)
        .await?
        .ok_or(CouncilError::NotFound("data source"))?;
    owned_project(state, owner, &source.project_id)
        .await
        .map_err(|_| CouncilError::NotFound("data source"))?;
    Ok(source)
}

#[cfg(test)]
pub(crate) mod tests;
