use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::core::agent::AnalysisAgent;
use crate::core::agent::runner::run_agent;
use crate::core::error::CouncilResult;
use crate::core::llm::{CompletionOptions, LlmProvider};
use crate::core::store::CouncilStore;

pub const SOME_AGENTS_FAILED: &str = "Some agents failed";

#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: String,
    /// `None` when the output row could not be written.
    pub output_id: Option<String>,
    /// Model text, or `Error: <message>` when the call failed.
    pub output: String,
    pub error: Option<String>,
}

/// Runs every analyst concurrently against the same context, joins all of
/// them, and persists one output row per analyst. Every analyst gets a result
/// even when its row cannot be written. Results come back in roster order;
/// rows are written in completion order.
pub(crate) async fn fan_out(
    store: &CouncilStore,
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
    run_id: &str,
    analysts: Vec<AnalysisAgent>,
    context: Arc<String>,
) -> CouncilResult<Vec<AgentResult>> {
    let mut set = JoinSet::new();
    let mut by_task = HashMap::new();

    for (idx, agent) in analysts.iter().enumerate() {
        let llm = llm.clone();
        let context = context.clone();
        let system_prompt = agent.system_prompt.clone();
        let handle = set.spawn(async move {
            run_agent(llm.as_ref(), &system_prompt, &context, &options).await
        });
        by_task.insert(handle.id(), idx);
    }

    let mut slots: Vec<Option<AgentResult>> = vec![None; analysts.len()];
    while let Some(joined) = set.join_next_with_id().await {
        let (idx, outcome) = match joined {
            Ok((id, res)) => (by_task.get(&id).copied(), res.map_err(|e| e.to_string())),
            Err(e) => (
                by_task.get(&e.id()).copied(),
                Err(if e.is_panic() {
                    "agent task panicked".to_string()
                } else {
                    "agent task cancelled".to_string()
                }),
            ),
        };
        let Some(idx) = idx else { continue };
        let agent = &analysts[idx];

        let (output, error) = match outcome {
            Ok(text) => (text, None),
            Err(msg) => {
                warn!("Agent '{}' failed: {}", agent.name, msg);
                (format!("Error: {}", msg), Some(msg))
            }
        };
        let metadata = json!({
            "agent_name": agent.name,
            "agent_type": agent.kind.as_str(),
            "input_message": context.as_str(),
            "error": error,
        });
        // A failed write is that agent's failure; the rest still get joined.
        let (output_id, error) = match store
            .insert_output(run_id, &agent.id, &output, &metadata)
            .await
        {
            Ok(row) => (Some(row.id), error),
            Err(e) => {
                error!("Output of agent '{}' was not recorded: {:#}", agent.name, e);
                let msg = format!("failed to record output: {}", e);
                let error = match error {
                    Some(prev) => format!("{}; {}", prev, msg),
                    None => msg,
                };
                (None, Some(error))
            }
        };

        slots[idx] = Some(AgentResult {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            agent_type: agent.kind.as_str().to_string(),
            output_id,
            output,
            error,
        });
    }

    let results: Vec<AgentResult> = slots.into_iter().flatten().collect();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    info!(
        "Fan-out for run {}: {} succeeded, {} failed",
        run_id,
        results.len() - failed,
        failed
    );
    Ok(results)
}
