use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::info;

use super::{ApiJson, ApiResult, owned_project};
use crate::core::error::CouncilError;
use crate::core::proposals::double_option;
use crate::core::store::types::ProjectPatch;
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Owner;

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

fn required_name(name: &str) -> Result<String, CouncilError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CouncilError::validation("Project name is required"));
    }
    Ok(name.to_string())
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let projects = state.council.store.list_projects(&owner.0).await?;
    Ok(Json(serde_json::json!({ "success": true, "projects": projects })))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(payload): ApiJson<CreateProjectRequest>,
) -> ApiResult {
    let name = required_name(&payload.name)?;
    let project = state
        .council
        .store
        .create_project(
            &owner.0,
            &name,
            payload.description.as_deref(),
            payload.image_url.as_deref(),
        )
        .await?;
    info!("Project {} created for {}", project.id, owner.0);
    Ok(Json(serde_json::json!({ "success": true, "project": project })))
}

pub async fn get_project(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let project = owned_project(&state, &owner, &project_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "project": project })))
}

pub async fn update_project(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(payload): ApiJson<UpdateProjectRequest>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let patch = ProjectPatch {
        name: payload.name.as_deref().map(required_name).transpose()?,
        description: payload.description,
        image_url: payload.image_url,
    };
    let project = state
        .council
        .store
        .update_project(&project_id, &patch)
        .await?
        .ok_or(CouncilError::NotFound("project"))?;
    Ok(Json(serde_json::json!({ "success": true, "project": project })))
}

pub async fn delete_project(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    state.council.store.delete_project(&project_id).await?;
    info!("Project {} deleted", project_id);
    Ok(Json(serde_json::json!({ "success": true })))
}
