//! Agents: the type tags, the analysis/synthesis split, and CRUD rules.

pub mod defaults;
pub mod runner;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::error::{CouncilError, CouncilResult};
use crate::core::store::CouncilStore;
use crate::core::store::types::{AgentRecord, NewAgent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    UserPersona,
    Marketing,
    CompetitiveIntel,
    Researcher,
    Designer,
    Analyst,
    CeoCpo,
    Custom,
}

impl AgentKind {
    pub const ALL: [AgentKind; 8] = [
        AgentKind::UserPersona,
        AgentKind::Marketing,
        AgentKind::CompetitiveIntel,
        AgentKind::Researcher,
        AgentKind::Designer,
        AgentKind::Analyst,
        AgentKind::CeoCpo,
        AgentKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::UserPersona => "user_persona",
            AgentKind::Marketing => "marketing",
            AgentKind::CompetitiveIntel => "competitive_intel",
            AgentKind::Researcher => "researcher",
            AgentKind::Designer => "designer",
            AgentKind::Analyst => "analyst",
            AgentKind::CeoCpo => "ceo_cpo",
            AgentKind::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    pub fn is_synthesis(&self) -> bool {
        matches!(self, AgentKind::CeoCpo)
    }
}

/// What an agent does when run. Only the `ceo_cpo` tag maps to `Synthesis`.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentRole {
    Analysis(String),
    Synthesis(String),
}

impl AgentRole {
    pub fn of(kind: AgentKind, system_prompt: &str) -> Self {
        if kind.is_synthesis() {
            AgentRole::Synthesis(system_prompt.to_string())
        } else {
            AgentRole::Analysis(system_prompt.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisAgent {
    pub id: String,
    pub name: String,
    pub kind: AgentKind,
    pub system_prompt: String,
}

#[derive(Debug, Clone)]
pub struct SynthesisAgent {
    pub id: String,
    pub name: String,
    pub system_prompt: String,
}

/// A project's agents split by role.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub analysts: Vec<AnalysisAgent>,
    pub synthesis: Option<SynthesisAgent>,
}

impl Roster {
    /// Rejects unknown type tags and more than one synthesis agent.
    pub fn from_records(records: &[AgentRecord]) -> CouncilResult<Self> {
        let mut roster = Roster::default();
        for rec in records {
            let kind = AgentKind::parse(&rec.agent_type).ok_or_else(|| {
                CouncilError::Configuration(format!(
                    "agent '{}' has unknown type '{}'",
                    rec.name, rec.agent_type
                ))
            })?;
            match AgentRole::of(kind, &rec.system_prompt) {
                AgentRole::Analysis(system_prompt) => roster.analysts.push(AnalysisAgent {
                    id: rec.id.clone(),
                    name: rec.name.clone(),
                    kind,
                    system_prompt,
                }),
                AgentRole::Synthesis(system_prompt) => {
                    if roster.synthesis.is_some() {
                        return Err(CouncilError::Configuration(
                            "more than one CEO/CPO agent is configured".to_string(),
                        ));
                    }
                    roster.synthesis = Some(SynthesisAgent {
                        id: rec.id.clone(),
                        name: rec.name.clone(),
                        system_prompt,
                    });
                }
            }
        }
        Ok(roster)
    }

    pub async fn load(store: &CouncilStore, project_id: &str) -> CouncilResult<Self> {
        let records = store.list_agents(project_id).await?;
        Self::from_records(&records)
    }

    pub fn require_analysts(&self) -> CouncilResult<&[AnalysisAgent]> {
        if self.analysts.is_empty() {
            return Err(CouncilError::Configuration(
                "No agents configured for this project".to_string(),
            ));
        }
        Ok(&self.analysts)
    }

    pub fn require_synthesis(&self) -> CouncilResult<&SynthesisAgent> {
        self.synthesis.as_ref().ok_or_else(|| {
            CouncilError::Configuration("CEO/CPO agent not configured".to_string())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub agent_type: Option<String>,
    pub system_prompt: Option<String>,
}

fn parse_kind(value: &str) -> CouncilResult<AgentKind> {
    AgentKind::parse(value)
        .ok_or_else(|| CouncilError::validation(format!("unknown agent type '{}'", value)))
}

fn non_blank(field: &str, value: &str) -> CouncilResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CouncilError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

async fn ensure_no_other_synthesis(
    store: &CouncilStore,
    project_id: &str,
    except_id: Option<&str>,
) -> CouncilResult<()> {
    let taken = store
        .list_agents(project_id)
        .await?
        .iter()
        .any(|a| a.agent_type == AgentKind::CeoCpo.as_str() && Some(a.id.as_str()) != except_id);
    if taken {
        return Err(CouncilError::validation(
            "project already has a CEO/CPO agent",
        ));
    }
    Ok(())
}

/// Inserts the seven default agents. Fails if defaults already exist.
pub async fn seed_defaults(
    store: &CouncilStore,
    project_id: &str,
) -> CouncilResult<Vec<AgentRecord>> {
    if store.count_default_agents(project_id).await? > 0 {
        return Err(CouncilError::validation(
            "Default agents already exist for this project",
        ));
    }
    ensure_no_other_synthesis(store, project_id, None).await?;
    let rows = store
        .insert_agents(project_id, &defaults::default_agents())
        .await?;
    info!("Seeded {} default agents for project {}", rows.len(), project_id);
    Ok(rows)
}

pub async fn create_agent(
    store: &CouncilStore,
    project_id: &str,
    draft: &AgentDraft,
) -> CouncilResult<AgentRecord> {
    let name = non_blank("name", &draft.name)?;
    let system_prompt = non_blank("system_prompt", &draft.system_prompt)?;
    let kind = parse_kind(&draft.agent_type)?;
    if kind.is_synthesis() {
        ensure_no_other_synthesis(store, project_id, None).await?;
    }
    let mut rows = store
        .insert_agents(
            project_id,
            &[NewAgent {
                name,
                agent_type: kind.as_str().to_string(),
                system_prompt,
                is_default: false,
            }],
        )
        .await?;
    rows.pop()
        .ok_or_else(|| CouncilError::Internal(anyhow::anyhow!("agent insert returned no row")))
}

/// Name and prompt are always editable; the type only on custom agents.
pub async fn update_agent(
    store: &CouncilStore,
    agent: &AgentRecord,
    patch: &AgentPatch,
) -> CouncilResult<AgentRecord> {
    let name = match &patch.name {
        Some(n) => non_blank("name", n)?,
        None => agent.name.clone(),
    };
    let system_prompt = match &patch.system_prompt {
        Some(p) => non_blank("system_prompt", p)?,
        None => agent.system_prompt.clone(),
    };
    let agent_type = match &patch.agent_type {
        Some(t) if t != &agent.agent_type => {
            if agent.is_default {
                return Err(CouncilError::validation(
                    "the type of a default agent cannot be changed",
                ));
            }
            let kind = parse_kind(t)?;
            if kind.is_synthesis() {
                ensure_no_other_synthesis(store, &agent.project_id, Some(&agent.id)).await?;
            }
            kind.as_str().to_string()
        }
        _ => agent.agent_type.clone(),
    };
    store
        .update_agent(&agent.id, &name, &agent_type, &system_prompt)
        .await?
        .ok_or(CouncilError::NotFound("agent"))
}

pub async fn delete_agent(store: &CouncilStore, agent: &AgentRecord) -> CouncilResult<()> {
    if agent.is_default {
        return Err(CouncilError::validation("default agents cannot be deleted"));
    }
    if !store.delete_custom_agent(&agent.id).await? {
        return Err(CouncilError::NotFound("agent"));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
