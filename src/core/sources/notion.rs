use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{SampleCategory, SourceFetcher, SourceItem, SourceKind, SourceSample};

/// Samples pages and databases through the Notion search API.
pub struct NotionFetcher {
    api_base: String,
    version: String,
    client: Client,
}

impl NotionFetcher {
    pub fn new(api_base: String, version: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            version,
            client: Client::new(),
        }
    }

    async fn search(&self, token: &str, object: &str, limit: usize) -> Result<Vec<Value>> {
        let url = format!("{}/v1/search", self.api_base);
        debug!("Notion search object={} page_size={}", object, limit);
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Notion-Version", &self.version)
            .json(&json!({
                "filter": { "property": "object", "value": object },
                "page_size": limit.clamp(1, 100),
            }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(anyhow!(
                "Notion API error ({}): {}",
                status.as_u16(),
                res.text().await.unwrap_or_default()
            ));
        }
        let body: Value = res.json().await?;
        let mut results = body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        results.truncate(limit);
        Ok(results)
    }
}

fn plain_text(rich_text: &Value) -> Option<String> {
    let text: String = rich_text
        .as_array()?
        .iter()
        .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
        .collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Page titles live in whichever property has type `title`; database titles
/// sit at the top level.
pub(crate) fn item_from_result(result: &Value) -> Option<SourceItem> {
    let id = result.get("id")?.as_str()?.to_string();
    let title = match result.get("object").and_then(Value::as_str) {
        Some("database") => result.get("title").and_then(plain_text),
        _ => result
            .get("properties")
            .and_then(Value::as_object)
            .and_then(|props| {
                props
                    .values()
                    .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
            })
            .and_then(|p| p.get("title"))
            .and_then(plain_text),
    };
    let url = result.get("url").and_then(Value::as_str).map(String::from);
    Some(SourceItem { id, title, url })
}

#[async_trait]
impl SourceFetcher for NotionFetcher {
    fn kind(&self) -> SourceKind {
        SourceKind::Notion
    }

    async fn fetch(&self, token: &str, limit: usize) -> Result<SourceSample> {
        let (pages, databases) = tokio::try_join!(
            self.search(token, "page", limit),
            self.search(token, "database", limit)
        )?;
        Ok(SourceSample {
            categories: vec![
                SampleCategory {
                    label: "Pages".to_string(),
                    unit: "page".to_string(),
                    items: pages.iter().filter_map(item_from_result).collect(),
                },
                SampleCategory {
                    label: "Databases".to_string(),
                    unit: "database".to_string(),
                    items: databases.iter().filter_map(item_from_result).collect(),
                },
            ],
        })
    }
}
