use axum::{
    Extension, Json,
    extract::{Path, State},
};

use super::{ApiResult, owned_project};
use crate::core::proposals::metrics::project_metrics;
use crate::interfaces::web::AppState;
use crate::interfaces::web::auth::Owner;

pub async fn get_metrics(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult {
    owned_project(&state, &owner, &project_id).await?;
    let metrics = project_metrics(&state.council.store, &project_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "metrics": metrics })))
}
