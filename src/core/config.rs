use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DATA_DIR_ENV: &str = "PMCOUNCIL_DATA_DIR";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const CONFIG_FILE: &str = "config.toml";
pub const DB_FILE: &str = "council.db";

/// Root data directory: `$PMCOUNCIL_DATA_DIR`, else `~/.pmcouncil`.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pmcouncil")
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: GenerationConfig,
    #[serde(default = "default_synthesis")]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to `$OPENAI_API_KEY` when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_analysis_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_synthesis_tokens")]
    pub max_tokens: u32,
    /// How many recent rejection reasons are fed back into synthesis.
    #[serde(default = "default_rejection_history")]
    pub rejection_history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_notion_base")]
    pub notion_api_base: String,
    #[serde(default = "default_notion_version")]
    pub notion_version: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    17990
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_llm_timeout() -> u64 {
    120
}
fn default_temperature() -> f32 {
    0.7
}
fn default_analysis_tokens() -> u32 {
    2000
}
fn default_synthesis_tokens() -> u32 {
    3000
}
fn default_rejection_history() -> usize {
    10
}
fn default_sample_limit() -> usize {
    20
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_notion_base() -> String {
    "https://api.notion.com".to_string()
}
fn default_notion_version() -> String {
    "2022-06-28".to_string()
}
fn default_synthesis() -> SynthesisConfig {
    SynthesisConfig::default()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_model(),
            api_key: None,
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_analysis_tokens(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_synthesis_tokens(),
            rejection_history: default_rejection_history(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            fetch_timeout_secs: default_fetch_timeout(),
            notion_api_base: default_notion_base(),
            notion_version: default_notion_version(),
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl SourcesConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

impl AppConfig {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE);
        if !config_path.exists() {
            info!("No {} found, using defaults.", CONFIG_FILE);
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Writes the default config unless one exists. Returns the path and
    /// whether a file was written.
    pub async fn write_default<P: AsRef<Path>>(data_dir: P) -> Result<(PathBuf, bool)> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;
        let config_path = data_dir.join(CONFIG_FILE);
        if config_path.exists() {
            return Ok((config_path, false));
        }
        let body = toml::to_string_pretty(&Self::default())?;
        tokio::fs::write(&config_path, body).await?;
        Ok((config_path, true))
    }
}
