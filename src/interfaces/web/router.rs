use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::auth;
use super::handlers::{actions, agents, metrics, projects, runs, sources};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn build_api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .layer(middleware::from_fn(security_headers))
        .with_state(state.clone());

    let authed_routes = Router::new()
        .route("/api/logs", get(super::sse_logs_endpoint))
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/api/projects/{id}/agents",
            get(agents::list_agents).post(agents::create_agent),
        )
        .route(
            "/api/projects/{id}/default-agents",
            post(agents::seed_default_agents),
        )
        .route("/api/projects/{id}/agents/run-all", post(runs::run_all))
        .route(
            "/api/projects/{id}/run-agents",
            post(runs::run_with_synthesis),
        )
        .route("/api/projects/{id}/refresh", post(runs::refresh_data))
        .route("/api/projects/{id}/runs", get(runs::list_runs))
        .route(
            "/api/projects/{id}/data-sources",
            get(sources::list_sources).post(sources::connect_source),
        )
        .route("/api/projects/{id}/actions", get(actions::list_actions))
        .route("/api/projects/{id}/metrics", get(metrics::get_metrics))
        .route(
            "/api/agents/{id}",
            get(agents::get_agent)
                .patch(agents::update_agent)
                .delete(agents::delete_agent),
        )
        .route("/api/agents/{id}/run", post(agents::run_agent))
        .route("/api/agents/{id}/outputs", get(agents::agent_outputs))
        .route("/api/runs/{id}/outputs", get(runs::run_outputs))
        .route("/api/data-sources/catalog", get(sources::source_catalog))
        .route(
            "/api/data-sources/{id}",
            axum::routing::delete(sources::disconnect_source),
        )
        .route(
            "/api/actions/{id}",
            get(actions::get_action).patch(actions::review_action),
        )
        .route(
            "/api/tracking/{id}",
            axum::routing::patch(actions::update_tracking),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.api_port))
        .with_state(state);

    public_routes.merge(authed_routes)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::web::handlers::tests::{json_request, test_state};
    use axum::http::StatusCode;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let app = build_api_router(test_state("127.0.0.1"));
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/projects")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn health_is_public_even_when_the_api_is_locked() {
        let app = build_api_router(test_state("0.0.0.0"));

        let (status, body) = json_request(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = json_request(&app, Method::GET, "/api/projects", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn cors_allows_only_localhost_origins() {
        let app = build_api_router(test_state("127.0.0.1"));
        let preflight = |origin: &'static str| {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/projects")
                .header(header::ORIGIN, origin)
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap()
        };

        let resp = app
            .clone()
            .oneshot(preflight("http://localhost:17990"))
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:17990"
        );

        let resp = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(
            !resp
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
