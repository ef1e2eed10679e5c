pub mod notion;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::core::credentials::CredentialCipher;
use crate::core::store::CouncilStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Notion,
    Jira,
    Slack,
    Github,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    ComingSoon,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: SourceKind,
    pub name: &'static str,
    pub description: &'static str,
    pub status: Availability,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Notion,
        SourceKind::Jira,
        SourceKind::Slack,
        SourceKind::Github,
        SourceKind::Linear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Notion => "notion",
            SourceKind::Jira => "jira",
            SourceKind::Slack => "slack",
            SourceKind::Github => "github",
            SourceKind::Linear => "linear",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == value.trim().to_lowercase())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Notion => "Notion",
            SourceKind::Jira => "JIRA",
            SourceKind::Slack => "Slack",
            SourceKind::Github => "GitHub",
            SourceKind::Linear => "Linear",
        }
    }

    pub fn availability(&self) -> Availability {
        match self {
            SourceKind::Notion => Availability::Available,
            _ => Availability::ComingSoon,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            SourceKind::Notion => {
                "Connect your Notion workspace to sync pages, databases, and content"
            }
            SourceKind::Jira => "Sync your JIRA issues, epics, and project data",
            SourceKind::Slack => {
                "Connect Slack channels to analyze team communications and feedback"
            }
            SourceKind::Github => "Sync GitHub repositories, issues, and pull requests",
            SourceKind::Linear => "Connect Linear workspace to sync issues and project data",
        }
    }
}

pub fn catalog() -> Vec<CatalogEntry> {
    SourceKind::ALL
        .into_iter()
        .map(|kind| CatalogEntry {
            id: kind,
            name: kind.display_name(),
            description: kind.description(),
            status: kind.availability(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceItem {
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// One kind of content a source exposes, e.g. Notion pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleCategory {
    /// Plural heading, e.g. "Pages".
    pub label: String,
    /// Singular noun, e.g. "page".
    pub unit: String,
    pub items: Vec<SourceItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceSample {
    pub categories: Vec<SampleCategory>,
}

impl SourceSample {
    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }
}

/// Best-effort snapshot of every source that fetched successfully.
pub type ContextSnapshot = BTreeMap<SourceKind, SourceSample>;

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch at most `limit` items per category.
    async fn fetch(&self, token: &str, limit: usize) -> Result<SourceSample>;
}

#[derive(Debug, Clone)]
pub struct ConnectedSource {
    pub kind: SourceKind,
    pub token: String,
}

#[derive(Clone)]
pub struct SourceRegistry {
    fetchers: HashMap<SourceKind, Arc<dyn SourceFetcher>>,
    sample_limit: usize,
    fetch_timeout: Duration,
}

impl SourceRegistry {
    pub fn new(sample_limit: usize, fetch_timeout: Duration) -> Self {
        Self {
            fetchers: HashMap::new(),
            sample_limit,
            fetch_timeout,
        }
    }

    pub fn register(&mut self, fetcher: Arc<dyn SourceFetcher>) {
        info!("Registered data source fetcher: {}", fetcher.kind().as_str());
        self.fetchers.insert(fetcher.kind(), fetcher);
    }

    /// Fetch every source concurrently, each under its own timeout, and wait
    /// for all of them. Results come back in input order.
    pub async fn fetch_all(
        &self,
        sources: Vec<ConnectedSource>,
    ) -> Vec<(SourceKind, Result<SourceSample>)> {
        let order: Vec<SourceKind> = sources.iter().map(|s| s.kind).collect();
        let mut by_task = HashMap::new();
        let mut results: HashMap<SourceKind, Result<SourceSample>> = HashMap::new();
        let mut set = JoinSet::new();

        for source in sources {
            let Some(fetcher) = self.fetchers.get(&source.kind).cloned() else {
                results.insert(
                    source.kind,
                    Err(anyhow!("no fetcher for {}", source.kind.as_str())),
                );
                continue;
            };
            let limit = self.sample_limit;
            let timeout = self.fetch_timeout;
            let handle = set.spawn(async move {
                match tokio::time::timeout(timeout, fetcher.fetch(&source.token, limit)).await {
                    Ok(res) => res,
                    Err(_) => Err(anyhow!("fetch timed out after {}s", timeout.as_secs())),
                }
            });
            by_task.insert(handle.id(), source.kind);
        }

        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((id, res)) => {
                    if let Some(kind) = by_task.get(&id) {
                        results.insert(*kind, res);
                    }
                }
                Err(e) => {
                    if let Some(kind) = by_task.get(&e.id()) {
                        results.insert(*kind, Err(anyhow!("fetch task aborted: {}", e)));
                    }
                }
            }
        }

        order
            .into_iter()
            .filter_map(|kind| results.remove(&kind).map(|r| (kind, r)))
            .collect()
    }

    /// Like `fetch_all`, but failures are logged and omitted.
    pub async fn gather(&self, sources: Vec<ConnectedSource>) -> ContextSnapshot {
        let mut snapshot = ContextSnapshot::new();
        for (kind, result) in self.fetch_all(sources).await {
            match result {
                Ok(sample) => {
                    snapshot.insert(kind, sample);
                }
                Err(e) => warn!("Skipping {} context: {:#}", kind.as_str(), e),
            }
        }
        snapshot
    }
}

/// Connected sources of a project with their credentials unsealed. Rows that
/// cannot be decrypted are flagged `error` and left out.
pub async fn connected_sources(
    store: &CouncilStore,
    cipher: &CredentialCipher,
    project_id: &str,
) -> Result<Vec<ConnectedSource>> {
    let mut out = Vec::new();
    for sealed in store.connected_credentials(project_id).await? {
        let Some(kind) = SourceKind::parse(&sealed.source_type) else {
            warn!("Ignoring unknown source type '{}'", sealed.source_type);
            continue;
        };
        match cipher.decrypt(&sealed.credential) {
            Ok(token) => out.push(ConnectedSource { kind, token }),
            Err(e) => {
                warn!("Credential for {} unreadable: {}", kind.as_str(), e);
                let rows = store.list_data_sources(project_id).await?;
                if let Some(row) = rows.iter().find(|r| r.source_type == sealed.source_type) {
                    store.set_data_source_status(&row.id, "error").await?;
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::test_cipher;
    use crate::core::store::test_store;

    struct Fixed(SourceKind, usize);

    #[async_trait]
    impl SourceFetcher for Fixed {
        fn kind(&self) -> SourceKind {
            self.0
        }

        async fn fetch(&self, _token: &str, limit: usize) -> Result<SourceSample> {
            let items = (0..self.1.min(limit))
                .map(|i| SourceItem {
                    id: i.to_string(),
                    title: Some(format!("Doc {}", i)),
                    url: None,
                })
                .collect();
            Ok(SourceSample {
                categories: vec![SampleCategory {
                    label: "Pages".into(),
                    unit: "page".into(),
                    items,
                }],
            })
        }
    }

    struct Broken(SourceKind);

    #[async_trait]
    impl SourceFetcher for Broken {
        fn kind(&self) -> SourceKind {
            self.0
        }

        async fn fetch(&self, _token: &str, _limit: usize) -> Result<SourceSample> {
            Err(anyhow!("token expired"))
        }
    }

    struct Hung(SourceKind);

    #[async_trait]
    impl SourceFetcher for Hung {
        fn kind(&self) -> SourceKind {
            self.0
        }

        async fn fetch(&self, _token: &str, _limit: usize) -> Result<SourceSample> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(SourceSample::default())
        }
    }

    fn conn(kind: SourceKind) -> ConnectedSource {
        ConnectedSource {
            kind,
            token: "t".into(),
        }
    }

    #[test]
    fn catalog_marks_only_notion_available() {
        let entries = catalog();
        assert_eq!(entries.len(), 5);
        let available: Vec<_> = entries
            .iter()
            .filter(|e| e.status == Availability::Available)
            .map(|e| e.id)
            .collect();
        assert_eq!(available, vec![SourceKind::Notion]);
        assert_eq!(SourceKind::parse("GitHub"), Some(SourceKind::Github));
        assert_eq!(SourceKind::parse("dropbox"), None);
    }

    #[tokio::test]
    async fn sample_limit_is_passed_to_fetchers() {
        let mut reg = SourceRegistry::new(20, Duration::from_secs(5));
        reg.register(Arc::new(Fixed(SourceKind::Notion, 50)));
        let snapshot = reg.gather(vec![conn(SourceKind::Notion)]).await;
        assert_eq!(snapshot[&SourceKind::Notion].item_count(), 20);
    }

    #[tokio::test]
    async fn failing_sources_are_omitted_not_raised() {
        let mut reg = SourceRegistry::new(20, Duration::from_millis(50));
        reg.register(Arc::new(Fixed(SourceKind::Notion, 2)));
        reg.register(Arc::new(Broken(SourceKind::Jira)));
        reg.register(Arc::new(Hung(SourceKind::Slack)));

        let results = reg
            .fetch_all(vec![
                conn(SourceKind::Jira),
                conn(SourceKind::Notion),
                conn(SourceKind::Slack),
                conn(SourceKind::Linear),
            ])
            .await;
        let kinds: Vec<_> = results.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                SourceKind::Jira,
                SourceKind::Notion,
                SourceKind::Slack,
                SourceKind::Linear
            ]
        );
        assert!(results[1].1.is_ok());
        assert!(
            results[2]
                .1
                .as_ref()
                .unwrap_err()
                .to_string()
                .contains("timed out")
        );

        let snapshot = reg
            .gather(vec![conn(SourceKind::Jira), conn(SourceKind::Notion)])
            .await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&SourceKind::Notion));
    }

    #[tokio::test]
    async fn unreadable_credentials_flag_the_source() {
        let store = test_store();
        let cipher = test_cipher();
        let project = store
            .create_project("o", "P", None, None)
            .await
            .unwrap();
        store
            .upsert_data_source(&project.id, "notion", "garbage")
            .await
            .unwrap();

        let sources = connected_sources(&store, &cipher, &project.id)
            .await
            .unwrap();
        assert!(sources.is_empty());
        let rows = store.list_data_sources(&project.id).await.unwrap();
        assert_eq!(rows[0].status, "error");

        let sealed = cipher.encrypt("secret").unwrap();
        store
            .upsert_data_source(&project.id, "notion", &sealed)
            .await
            .unwrap();
        let sources = connected_sources(&store, &cipher, &project.id)
            .await
            .unwrap();
        assert_eq!(sources[0].token, "secret");
    }
}
