use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{Council, RunKind, RunOutcome, bracketed};
use crate::core::agent::{AgentKind, SynthesisAgent};
use crate::core::error::{CouncilError, CouncilResult};
use crate::core::llm::{ChatMessage, extract_json_block};
use crate::core::prompt::{AgentAnalysis, build_synthesis_message};
use crate::core::sources::ContextSnapshot;
use crate::core::store::types::{ActionRecord, NewAction, ProjectRecord, RunRecord};

pub const MIN_ACTIONS: usize = 2;
pub const MAX_ACTIONS: usize = 3;

/// Shapes a synthesis reply may take, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// `[ {...}, ... ]`
    BareArray,
    /// `{ "actions": [ ... ] }`
    WrappedActions,
    /// `{ "proposed_actions": [ ... ] }`
    WrappedProposedActions,
}

impl ParseStrategy {
    pub const ORDER: [ParseStrategy; 3] = [
        ParseStrategy::BareArray,
        ParseStrategy::WrappedActions,
        ParseStrategy::WrappedProposedActions,
    ];

    fn select<'a>(&self, value: &'a Value) -> Option<&'a Vec<Value>> {
        match self {
            ParseStrategy::BareArray => value.as_array(),
            ParseStrategy::WrappedActions => value.get("actions")?.as_array(),
            ParseStrategy::WrappedProposedActions => value.get("proposed_actions")?.as_array(),
        }
    }
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    justification: Option<String>,
}

fn normalize(raw: RawAction) -> Option<NewAction> {
    let title = raw.title?.trim().to_string();
    if title.is_empty() {
        return None;
    }
    Some(NewAction {
        title,
        description: raw.description.unwrap_or_default().trim().to_string(),
        justification: raw.justification.unwrap_or_default().trim().to_string(),
    })
}

/// Parses a synthesis reply into 2..=3 actions. Entries without a title are
/// dropped; anything past the third is discarded.
pub fn parse_actions(text: &str) -> Result<(ParseStrategy, Vec<NewAction>), String> {
    let block = extract_json_block(text).ok_or("response contained no JSON")?;
    let value: Value =
        serde_json::from_str(block).map_err(|e| format!("response was not valid JSON: {}", e))?;

    let (strategy, entries) = ParseStrategy::ORDER
        .iter()
        .find_map(|s| s.select(&value).map(|entries| (*s, entries)))
        .ok_or("response had no action list")?;

    let mut actions: Vec<NewAction> = entries
        .iter()
        .filter_map(|v| serde_json::from_value::<RawAction>(v.clone()).ok())
        .filter_map(normalize)
        .collect();

    if actions.is_empty() {
        return Err("No actions generated".to_string());
    }
    if actions.len() < MIN_ACTIONS {
        return Err(format!(
            "expected at least {} actions, got {}",
            MIN_ACTIONS,
            actions.len()
        ));
    }
    actions.truncate(MAX_ACTIONS);
    Ok((strategy, actions))
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub run: RunRecord,
    pub actions: Vec<ActionRecord>,
}

impl Council {
    /// One synthesis call in its own `final_synthesis` run. Either 2..=3
    /// pending actions are created or none are and the error is returned.
    pub async fn synthesize(
        &self,
        project: &ProjectRecord,
        agent: &SynthesisAgent,
        snapshot: &ContextSnapshot,
        analyses: Vec<AgentAnalysis>,
    ) -> CouncilResult<SynthesisReport> {
        let rejections: Vec<String> = self
            .store
            .recent_rejections(&project.id, self.config.synthesis.rejection_history)
            .await?
            .into_iter()
            .map(|r| r.rejection_reason)
            .collect();
        let message = build_synthesis_message(project, snapshot, &rejections, &analyses);

        let council = self.clone();
        let project_id = project.id.clone();
        let agent = agent.clone();
        let (run, actions) = bracketed(
            &self.store,
            &project.id,
            RunKind::FinalSynthesis,
            move |run| async move {
                council
                    .synthesis_body(&run, &project_id, &agent, message)
                    .await
                    .map(RunOutcome::completed)
            },
        )
        .await?;

        info!("Synthesis run {} proposed {} actions", run.id, actions.len());
        Ok(SynthesisReport { run, actions })
    }

    async fn synthesis_body(
        &self,
        run: &RunRecord,
        project_id: &str,
        agent: &SynthesisAgent,
        message: String,
    ) -> CouncilResult<Vec<ActionRecord>> {
        let messages = vec![
            ChatMessage::system(agent.system_prompt.clone()),
            ChatMessage::user(message.clone()),
        ];
        let parsed = match self
            .llm
            .complete(&messages, &self.synthesis_options())
            .await
        {
            Ok(text) => parse_actions(&text).map_err(|e| (e, Some(text))),
            Err(e) => Err((e.to_string(), None)),
        };

        match parsed {
            Ok((strategy, actions)) => {
                let pretty = serde_json::to_string_pretty(&actions)
                    .map_err(|e| CouncilError::Internal(e.into()))?;
                let metadata = json!({
                    "agent_name": agent.name,
                    "agent_type": AgentKind::CeoCpo.as_str(),
                    "input_message": message,
                    "parse_strategy": format!("{:?}", strategy),
                    "proposed_actions_count": actions.len(),
                });
                let (_, inserted) = self
                    .store
                    .insert_synthesis_result(
                        project_id, &run.id, &agent.id, &pretty, &metadata, &actions,
                    )
                    .await?;
                Ok(inserted)
            }
            Err((msg, raw)) => {
                warn!("Synthesis run {} failed: {}", run.id, msg);
                let metadata = json!({
                    "agent_name": agent.name,
                    "agent_type": AgentKind::CeoCpo.as_str(),
                    "input_message": message,
                    "error": msg,
                    "raw_response": raw,
                });
                self.store
                    .insert_output(&run.id, &agent.id, &format!("Error: {}", msg), &metadata)
                    .await?;
                Err(CouncilError::Synthesis(msg))
            }
        }
    }
}
