use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use super::{ApiJson, ApiResult, owned_action, owned_project, owned_tracking};
use crate::core::error::CouncilError;
use crate::core::proposals::{self, ActionStatus, ReviewRequest, TrackingUpdate};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Owner;

#[derive(Deserialize)]
pub struct ActionListQuery {
    pub status: Option<String>,
}

pub async fn list_actions(
    Path(project_id): Path<String>,
    Query(query): Query<ActionListQuery>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            ActionStatus::parse(s)
                .ok_or_else(|| CouncilError::validation(format!("unknown status '{}'", s)))?,
        ),
    };
    let actions = state
        .council
        .store
        .list_actions(&project_id, status.map(|s| s.as_str()))
        .await?;
    Ok(Json(serde_json::json!({ "success": true, "actions": actions })))
}

pub async fn get_action(
    Path(action_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let action = owned_action(&state, &owner, &action_id).await?;
    let detail = proposals::action_detail(&state.council.store, action).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "action": detail.action,
        "tracking": detail.tracking,
        "rejection": detail.rejection,
    })))
}

/// Accept or reject.
pub async fn review_action(
    Path(action_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> ApiResult {
    let action = owned_action(&state, &owner, &action_id).await?;
    let detail = proposals::review(&state.council.store, &action, &request).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "action": detail.action,
        "tracking": detail.tracking,
        "rejection": detail.rejection,
    })))
}

pub async fn update_tracking(
    Path(tracking_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(update): ApiJson<TrackingUpdate>,
) -> ApiResult {
    let tracking = owned_tracking(&state, &owner, &tracking_id).await?;
    let tracking = proposals::update_tracking(&state.council.store, &tracking, &update).await?;
    Ok(Json(serde_json::json!({ "success": true, "tracking": tracking })))
}
