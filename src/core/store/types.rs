use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
}

/// Data-source row as exposed to callers. The credential never leaves the store
/// through this type.
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceRecord {
    pub id: String,
    pub project_id: String,
    pub source_type: String,
    pub status: String,
    pub connected_at: Option<String>,
    pub created_at: String,
}

/// A connected source with its still-encrypted credential.
#[derive(Debug, Clone)]
pub struct SealedCredential {
    pub source_type: String,
    pub credential: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRecord {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub agent_type: String,
    pub system_prompt: String,
    pub is_default: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub agent_type: String,
    pub system_prompt: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: String,
    pub project_id: String,
    pub run_type: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    pub id: String,
    pub agent_run_id: String,
    pub agent_id: String,
    pub output_text: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAction {
    pub title: String,
    pub description: String,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRecord {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub justification: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectionRecord {
    pub id: String,
    pub proposed_action_id: String,
    pub rejection_reason: String,
    pub created_at: String,
}

/// A rejection joined with the title of the action it closed.
#[derive(Debug, Clone, Serialize)]
pub struct RejectionSummary {
    pub proposed_action_id: String,
    pub title: String,
    pub rejection_reason: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingRecord {
    pub id: String,
    pub proposed_action_id: String,
    pub status: String,
    pub comments: Option<String>,
    pub success_score: Option<i64>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields written by a tracking update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TrackingWrite {
    pub comments: Option<Option<String>>,
    pub success_score: Option<Option<i64>>,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiTokenRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub created_at: String,
}
