pub(crate) mod auth;
mod handlers;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use std::convert::Infallible;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::core::lifecycle::LifecycleComponent;
use crate::core::orchestrator::Council;

pub use router::build_api_router;

pub struct ApiServerConfig {
    pub council: Council,
    pub log_tx: tokio::sync::broadcast::Sender<String>,
    pub api_host: String,
    pub api_port: u16,
}

pub struct ApiServer {
    state: AppState,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) council: Council,
    pub(crate) log_tx: tokio::sync::broadcast::Sender<String>,
    pub(crate) api_host: String,
    pub(crate) api_port: u16,
}

impl AppState {
    pub(crate) fn is_loopback(&self) -> bool {
        matches!(self.api_host.as_str(), "127.0.0.1" | "::1" | "localhost")
    }
}

impl ApiServer {
    pub fn new(config: ApiServerConfig) -> Self {
        Self {
            state: AppState {
                council: config.council,
                log_tx: config.log_tx,
                api_host: config.api_host,
                api_port: config.api_port,
            },
        }
    }
}

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(log) => Ok(Event::default().data(log)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API server initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.state.api_host, self.state.api_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind API server on {}", addr))?;
        let app = build_api_router(self.state.clone());

        info!("API server running at http://{addr}");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server crashed: {}", e);
            }
        });
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API server shutting down...");
        Ok(())
    }
}
