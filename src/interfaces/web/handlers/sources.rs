use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::info;

use super::{ApiJson, ApiResult, owned_project, owned_source};
use crate::core::error::CouncilError;
use crate::core::sources::{Availability, SourceKind, catalog};
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Owner;

#[derive(Deserialize)]
pub struct ConnectSourceRequest {
    pub source_type: String,
    pub access_token: String,
}

pub async fn source_catalog() -> ApiResult {
    Ok(Json(serde_json::json!({ "success": true, "sources": catalog() })))
}

pub async fn list_sources(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let sources = state.council.store.list_data_sources(&project_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "data_sources": sources })))
}

/// Stores the credential sealed. Reconnecting the same type replaces it.
pub async fn connect_source(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    ApiJson(payload): ApiJson<ConnectSourceRequest>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let kind = SourceKind::parse(&payload.source_type).ok_or_else(|| {
        CouncilError::validation(format!("unknown source type '{}'", payload.source_type))
    })?;
    if kind.availability() != Availability::Available {
        return Err(CouncilError::validation(format!(
            "{} integration is coming soon",
            kind.display_name()
        ))
        .into());
    }
    let token = payload.access_token.trim();
    if token.is_empty() {
        return Err(CouncilError::validation("access_token is required").into());
    }

    let sealed = state.council.cipher.encrypt(token)?;
    let source = state
        .council
        .store
        .upsert_data_source(&project_id, kind.as_str(), &sealed)
        .await?;
    info!("Connected {} for project {}", kind.as_str(), project_id);
    Ok(Json(serde_json::json!({ "success": true, "data_source": source })))
}

pub async fn disconnect_source(
    Path(source_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    let source = owned_source(&state, &owner, &source_id).await?;
    state.council.store.delete_data_source(&source_id).await?;
    info!(
        "Disconnected {} from project {}",
        source.source_type, source.project_id
    );
    Ok(Json(serde_json::json!({ "success": true })))
}
