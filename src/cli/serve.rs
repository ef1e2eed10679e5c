use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::config::{AppConfig, data_dir};
use crate::core::credentials::CredentialCipher;
use crate::core::lifecycle::LifecycleManager;
use crate::core::llm::openai::OpenAiCompatProvider;
use crate::core::llm::{LlmProvider, UnconfiguredProvider};
use crate::core::orchestrator::Council;
use crate::core::sources::SourceRegistry;
use crate::core::sources::notion::NotionFetcher;
use crate::core::store::CouncilStore;
use crate::core::terminal::{self, print_link, print_status, print_warn};
use crate::interfaces::web::{ApiServer, ApiServerConfig};
use crate::logging::{init_tracing, parse_level};

fn build_llm(config: &AppConfig) -> Arc<dyn LlmProvider> {
    match config.llm.resolved_api_key() {
        Some(key) => Arc::new(OpenAiCompatProvider::new(
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            key,
        )),
        None => {
            print_warn("No model API key configured; runs will fail until one is set.");
            Arc::new(UnconfiguredProvider)
        }
    }
}

fn build_sources(config: &AppConfig) -> SourceRegistry {
    let mut sources =
        SourceRegistry::new(config.sources.sample_limit, config.sources.fetch_timeout());
    sources.register(Arc::new(NotionFetcher::new(
        config.sources.notion_api_base.clone(),
        config.sources.notion_version.clone(),
    )));
    sources
}

pub async fn run_serve(api_host: Option<String>, api_port: Option<u16>) -> Result<()> {
    let dir = data_dir();
    let config = AppConfig::load(&dir).await?;
    let log_tx = init_tracing(parse_level(&config.server.log_level));

    let api_host = api_host.unwrap_or_else(|| config.server.host.clone());
    let api_port = api_port.unwrap_or(config.server.port);

    let store = CouncilStore::open(&dir).await?;
    let cipher = CredentialCipher::for_local_machine()?;
    let llm = build_llm(&config);
    let sources = build_sources(&config);
    let model = config.llm.model.clone();
    let council = Council::new(store.clone(), llm, sources, cipher, Arc::new(config));

    let mut lifecycle = LifecycleManager::new();
    lifecycle.attach(Arc::new(Mutex::new(store)));
    lifecycle.attach(Arc::new(Mutex::new(ApiServer::new(ApiServerConfig {
        council,
        log_tx,
        api_host: api_host.clone(),
        api_port,
    }))));
    lifecycle.start().await?;

    terminal::print_banner();
    print_status("Data", &dir.display().to_string());
    print_status("Model", &model);
    print_link("API", &format!("http://{}:{}/api", api_host, api_port));

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");
    lifecycle.shutdown().await;
    Ok(())
}
