mod bracket;
mod fanout;
mod pipeline;
mod synthesis;

use serde::Serialize;
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::credentials::CredentialCipher;
use crate::core::llm::{CompletionOptions, LlmProvider, TimeoutProvider};
use crate::core::sources::SourceRegistry;
use crate::core::store::CouncilStore;

pub use bracket::{RunOutcome, bracketed};
pub use fanout::AgentResult;
pub use pipeline::{
    AnalysisReport, PipelineReport, RefreshReport, SingleRunReport, SourceRefresh,
};
pub use synthesis::{ParseStrategy, SynthesisReport, parse_actions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    DataRefresh,
    AgentAnalysis,
    FinalSynthesis,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::DataRefresh => "data_refresh",
            RunKind::AgentAnalysis => "agent_analysis",
            RunKind::FinalSynthesis => "final_synthesis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Run status only moves forward; terminal states never reopen.
pub fn can_transition(from: RunStatus, to: RunStatus) -> bool {
    match from {
        RunStatus::Pending => matches!(
            to,
            RunStatus::Running | RunStatus::Completed | RunStatus::Failed
        ),
        RunStatus::Running => matches!(to, RunStatus::Completed | RunStatus::Failed),
        RunStatus::Completed | RunStatus::Failed => false,
    }
}

/// Everything an orchestration needs, cheap to clone into spawned tasks.
#[derive(Clone)]
pub struct Council {
    pub store: CouncilStore,
    pub llm: Arc<dyn LlmProvider>,
    pub sources: SourceRegistry,
    pub cipher: CredentialCipher,
    pub config: Arc<AppConfig>,
}

impl Council {
    /// Every model call made through the council is bounded by the configured
    /// request timeout.
    pub fn new(
        store: CouncilStore,
        llm: Arc<dyn LlmProvider>,
        sources: SourceRegistry,
        cipher: CredentialCipher,
        config: Arc<AppConfig>,
    ) -> Self {
        let llm = TimeoutProvider::wrap(llm, config.llm.request_timeout());
        Self {
            store,
            llm,
            sources,
            cipher,
            config,
        }
    }

    pub fn analysis_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.config.analysis.temperature,
            max_tokens: self.config.analysis.max_tokens,
            json_mode: false,
        }
    }

    pub fn synthesis_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.config.synthesis.temperature,
            max_tokens: self.config.synthesis.max_tokens,
            json_mode: true,
        }
    }
}

#[cfg(test)]
mod tests;
