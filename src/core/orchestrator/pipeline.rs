use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::fanout::{SOME_AGENTS_FAILED, fan_out};
use super::synthesis::SynthesisReport;
use super::{AgentResult, Council, RunKind, RunOutcome, bracketed};
use crate::core::agent::{AgentKind, AnalysisAgent, Roster};
use crate::core::error::{CouncilError, CouncilResult};
use crate::core::prompt::{AgentAnalysis, build_analysis_message};
use crate::core::sources::{ContextSnapshot, SourceSample, connected_sources};
use crate::core::store::types::{AgentRecord, ProjectRecord, RunRecord};

/// Items echoed back per category by a data refresh.
const REFRESH_PREVIEW: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run: RunRecord,
    pub results: Vec<AgentResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl AnalysisReport {
    pub fn summary(&self) -> String {
        format!("{} succeeded, {} failed", self.succeeded, self.failed)
    }

    fn analyses(&self) -> Vec<AgentAnalysis> {
        self.results
            .iter()
            .map(|r| AgentAnalysis {
                agent_name: r.agent_name.clone(),
                output: r.output.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleRunReport {
    pub run: RunRecord,
    pub result: AgentResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub analysis: AnalysisReport,
    pub synthesis: SynthesisReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceRefresh {
    pub source_type: String,
    pub item_count: usize,
    pub preview: Option<SourceSample>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run: RunRecord,
    pub sources: Vec<SourceRefresh>,
}

fn preview(sample: &SourceSample) -> SourceSample {
    let mut sample = sample.clone();
    for category in &mut sample.categories {
        category.items.truncate(REFRESH_PREVIEW);
    }
    sample
}

impl Council {
    /// Best-effort snapshot of every connected source of the project.
    pub async fn gather_context(&self, project_id: &str) -> CouncilResult<ContextSnapshot> {
        let sources = connected_sources(&self.store, &self.cipher, project_id).await?;
        Ok(self.sources.gather(sources).await)
    }

    /// One `agent_analysis` run over `analysts`, context gathered once.
    async fn analysis_run(
        &self,
        project: &ProjectRecord,
        snapshot: &ContextSnapshot,
        analysts: Vec<AnalysisAgent>,
    ) -> CouncilResult<AnalysisReport> {
        let context = Arc::new(build_analysis_message(project, snapshot));
        let store = self.store.clone();
        let llm = self.llm.clone();
        let options = self.analysis_options();

        let (run, results) = bracketed(
            &self.store,
            &project.id,
            RunKind::AgentAnalysis,
            move |run| async move {
                let results = fan_out(&store, llm, options, &run.id, analysts, context).await?;
                if results.iter().any(|r| r.error.is_some()) {
                    Ok(RunOutcome::failed(results, SOME_AGENTS_FAILED))
                } else {
                    Ok(RunOutcome::completed(results))
                }
            },
        )
        .await?;

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        Ok(AnalysisReport {
            run,
            succeeded: results.len() - failed,
            failed,
            results,
        })
    }

    /// Runs a single analysis agent in its own run.
    pub async fn run_single_agent(
        &self,
        project: &ProjectRecord,
        agent: &AgentRecord,
    ) -> CouncilResult<SingleRunReport> {
        let kind = AgentKind::parse(&agent.agent_type).ok_or_else(|| {
            CouncilError::Configuration(format!("unknown agent type '{}'", agent.agent_type))
        })?;
        if kind.is_synthesis() {
            return Err(CouncilError::validation(
                "the CEO/CPO agent only runs as part of synthesis",
            ));
        }
        let analyst = AnalysisAgent {
            id: agent.id.clone(),
            name: agent.name.clone(),
            kind,
            system_prompt: agent.system_prompt.clone(),
        };

        let snapshot = self.gather_context(&project.id).await?;
        let report = self.analysis_run(project, &snapshot, vec![analyst]).await?;
        let result = report.results.into_iter().next().ok_or_else(|| {
            CouncilError::Internal(anyhow::anyhow!("analysis run produced no output"))
        })?;
        Ok(SingleRunReport {
            run: report.run,
            result,
        })
    }

    /// Fan-out over every analysis agent, no synthesis.
    pub async fn run_all(&self, project: &ProjectRecord) -> CouncilResult<AnalysisReport> {
        let roster = Roster::load(&self.store, &project.id).await?;
        let analysts = roster.require_analysts()?.to_vec();
        let snapshot = self.gather_context(&project.id).await?;
        let report = self.analysis_run(project, &snapshot, analysts).await?;
        info!("Run-all for project {}: {}", project.id, report.summary());
        Ok(report)
    }

    /// Fan-out, then synthesis over every output including error placeholders.
    /// The analysis run closes on its own terms before synthesis starts.
    pub async fn run_with_synthesis(
        &self,
        project: &ProjectRecord,
    ) -> CouncilResult<PipelineReport> {
        let roster = Roster::load(&self.store, &project.id).await?;
        let analysts = roster.require_analysts()?.to_vec();
        let synthesis_agent = roster.require_synthesis()?.clone();

        let snapshot = self.gather_context(&project.id).await?;
        let analysis = self.analysis_run(project, &snapshot, analysts).await?;
        info!(
            "Analysis for project {}: {}; starting synthesis",
            project.id,
            analysis.summary()
        );

        let synthesis = self
            .synthesize(project, &synthesis_agent, &snapshot, analysis.analyses())
            .await?;
        Ok(PipelineReport {
            analysis,
            synthesis,
        })
    }

    /// Fetches every connected source in a `data_refresh` run. Source failures
    /// fail the run but are reported, not raised.
    pub async fn refresh_data(&self, project: &ProjectRecord) -> CouncilResult<RefreshReport> {
        let sources = connected_sources(&self.store, &self.cipher, &project.id).await?;
        if sources.is_empty() {
            return Err(CouncilError::validation(
                "No connected data sources to refresh",
            ));
        }
        let registry = self.sources.clone();

        let (run, refreshed) = bracketed(
            &self.store,
            &project.id,
            RunKind::DataRefresh,
            move |_run| async move {
                let mut refreshed = Vec::new();
                let mut errors = Vec::new();
                for (kind, result) in registry.fetch_all(sources).await {
                    match result {
                        Ok(sample) => refreshed.push(SourceRefresh {
                            source_type: kind.as_str().to_string(),
                            item_count: sample.item_count(),
                            preview: Some(preview(&sample)),
                            error: None,
                        }),
                        Err(e) => {
                            let msg = format!("{}: {:#}", kind.as_str(), e);
                            errors.push(msg.clone());
                            refreshed.push(SourceRefresh {
                                source_type: kind.as_str().to_string(),
                                item_count: 0,
                                preview: None,
                                error: Some(msg),
                            });
                        }
                    }
                }
                if errors.is_empty() {
                    Ok(RunOutcome::completed(refreshed))
                } else {
                    Ok(RunOutcome::failed(refreshed, errors.join("; ")))
                }
            },
        )
        .await?;

        Ok(RefreshReport {
            run,
            sources: refreshed,
        })
    }
}
