
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Council;
use crate::core::config::AppConfig;
use crate::core::credentials::test_cipher;
use crate::core::llm::{ChatMessage, CompletionOptions, LlmError, LlmProvider};
use crate::core::sources::{
    SampleCategory, SourceFetcher, SourceItem, SourceKind, SourceRegistry, SourceSample,
};
use crate::core::store::types::{AgentRecord, NewAgent, ProjectRecord};
use crate::core::store::{CouncilStore, test_store};

pub(super) const THREE_ACTIONS: &str = r#"{"actions": [
    {"title": "Ship onboarding checklist", "description": "Guide new teams", "justification": "Activation is flat"},
    {"title": "Launch annual plan", "description": "Discounted yearly billing", "justification": "Churn is monthly"},
    {"title": "Add calendar sync", "description": "Two-way sync", "justification": "Top request"}
]}"#;

/// Analysis calls are steered by markers in the agent's system prompt:
/// `[fail]`, `[panic]` and `[slow]`. Synthesis calls (JSON mode) pop the next
/// scripted reply and fall back to [`THREE_ACTIONS`].
#[derive(Default)]
pub(super) struct ScriptedLlm {
    synthesis_replies: Mutex<VecDeque<Result<String, String>>>,
    synthesis_prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(super) fn script(&self, reply: Result<&str, &str>) {
        self.synthesis_replies
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string).map_err(str::to_string));
    }

    pub(super) fn synthesis_prompts(&self) -> Vec<String> {
        self.synthesis_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if options.json_mode {
            self.synthesis_prompts
                .lock()
                .unwrap()
                .push(messages[1].content.clone());
            let next = self.synthesis_replies.lock().unwrap().pop_front();
            return match next {
                Some(Ok(text)) => Ok(text),
                Some(Err(body)) => Err(LlmError::Api { status: 500, body }),
                None => Ok(THREE_ACTIONS.to_string()),
            };
        }

        let system = &messages[0].content;
        if system.contains("[panic]") {
            panic!("scripted analyst blew up");
        }
        if system.contains("[slow]") {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if system.contains("[fail]") {
            return Err(LlmError::Api {
                status: 500,
                body: "quota exceeded".to_string(),
            });
        }
        Ok("## Findings\n\n**Retention** is the main risk.".to_string())
    }
}

pub(super) struct DownNotion;

#[async_trait]
impl SourceFetcher for DownNotion {
    fn kind(&self) -> SourceKind {
        SourceKind::Notion
    }

    async fn fetch(&self, _token: &str, _limit: usize) -> anyhow::Result<SourceSample> {
        Err(anyhow!("notion unreachable"))
    }
}

pub(super) struct TwoPages;

#[async_trait]
impl SourceFetcher for TwoPages {
    fn kind(&self) -> SourceKind {
        SourceKind::Notion
    }

    async fn fetch(&self, _token: &str, _limit: usize) -> anyhow::Result<SourceSample> {
        Ok(SourceSample {
            categories: vec![SampleCategory {
                label: "Pages".to_string(),
                unit: "page".to_string(),
                items: vec![
                    SourceItem {
                        id: "p1".to_string(),
                        title: Some("Roadmap Q3".to_string()),
                        url: None,
                    },
                    SourceItem {
                        id: "p2".to_string(),
                        title: None,
                        url: None,
                    },
                ],
            }],
        })
    }
}

/// Deletes `victim`'s agent row during any call whose system prompt carries
/// `[vanish]`, so a later output write for that agent hits the foreign key.
/// Other analysis calls answer after a short delay.
pub(super) struct VanishingLlm {
    pub(super) store: CouncilStore,
    pub(super) victim: String,
}

#[async_trait]
impl LlmProvider for VanishingLlm {
    fn name(&self) -> &str {
        "vanishing"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if messages[0].content.contains("[vanish]") {
            assert!(self.store.delete_custom_agent(&self.victim).await.unwrap());
        } else {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        if options.json_mode {
            Ok(THREE_ACTIONS.to_string())
        } else {
            Ok("## Findings\n\nSteady.".to_string())
        }
    }
}

/// Council with a one-second model timeout.
pub(super) fn test_council(
    store: CouncilStore,
    llm: Arc<ScriptedLlm>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
) -> Council {
    council_with(store, llm, fetcher)
}

pub(super) fn council_with(
    store: CouncilStore,
    llm: Arc<dyn LlmProvider>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
) -> Council {
    let mut config = AppConfig::default();
    config.llm.request_timeout_secs = 1;
    let mut sources = SourceRegistry::new(config.sources.sample_limit, Duration::from_secs(2));
    if let Some(fetcher) = fetcher {
        sources.register(fetcher);
    }
    Council::new(store, llm, sources, test_cipher(), Arc::new(config))
}

pub(super) async fn project(store: &CouncilStore) -> ProjectRecord {
    store
        .create_project("owner", "Atlas", Some("Scheduling for clinics"), None)
        .await
        .unwrap()
}

/// Adds agents as `(name, type, system prompt)`.
pub(super) async fn add_agents(
    store: &CouncilStore,
    project_id: &str,
    agents: &[(&str, &str, &str)],
) -> Vec<AgentRecord> {
    let rows: Vec<NewAgent> = agents
        .iter()
        .map(|(name, agent_type, prompt)| NewAgent {
            name: name.to_string(),
            agent_type: agent_type.to_string(),
            system_prompt: prompt.to_string(),
            is_default: false,
        })
        .collect();
    store.insert_agents(project_id, &rows).await.unwrap()
}

pub(super) async fn connect_notion(council: &Council, project_id: &str) {
    let sealed = council.cipher.encrypt("secret_notion_token").unwrap();
    council
        .store
        .upsert_data_source(project_id, "notion", &sealed)
        .await
        .unwrap();
}

pub(super) fn fresh_store() -> CouncilStore {
    test_store()
}
