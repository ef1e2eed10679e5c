use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use super::AppState;

/// Owner used for unauthenticated loopback access when no tokens exist.
pub const LOCAL_OWNER: &str = "local";

/// Verified identity of the caller, inserted by [`require_auth`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

fn bearer(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let store = &state.council.store;

    if let Some(raw_token) = bearer(&req) {
        return match store.resolve_api_token(&raw_token).await {
            Ok(Some(owner)) => {
                req.extensions_mut().insert(Owner(owner));
                next.run(req).await
            }
            Ok(None) => {
                warn!("Rejected request with unknown API token");
                unauthorized("Invalid or unauthorized API token")
            }
            Err(e) => {
                error!("Token lookup failed: {:#}", e);
                unauthorized("Invalid or unauthorized API token")
            }
        };
    }

    let any_tokens_exist = match store.has_any_api_tokens().await {
        Ok(found) => found,
        Err(e) => {
            error!("Token lookup failed: {:#}", e);
            true
        }
    };
    if any_tokens_exist {
        return unauthorized("Missing or invalid Authorization header. Use: Bearer <token>");
    }

    // No tokens configured: open access only on loopback.
    if state.is_loopback() {
        req.extensions_mut().insert(Owner(LOCAL_OWNER.to_string()));
        return next.run(req).await;
    }
    unauthorized(
        "No API tokens configured. Create one with `pmcouncil token create` before exposing on a non-loopback address.",
    )
}
