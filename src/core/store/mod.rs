mod actions;
mod agents;
mod projects;
mod runs;
mod sources;
mod tokens;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::lifecycle::LifecycleComponent;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    image_url TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id, created_at);

CREATE TABLE IF NOT EXISTS data_sources (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    source_type TEXT NOT NULL,
    credential TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'connected',
    connected_at DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(project_id, source_type)
);

CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    system_prompt TEXT NOT NULL,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_agents_project ON agents(project_id);

CREATE TABLE IF NOT EXISTS agent_runs (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    run_type TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    completed_at DATETIME,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_agent_runs_project ON agent_runs(project_id, started_at);

CREATE TABLE IF NOT EXISTS agent_outputs (
    id TEXT PRIMARY KEY,
    agent_run_id TEXT NOT NULL REFERENCES agent_runs(id) ON DELETE CASCADE,
    agent_id TEXT NOT NULL REFERENCES agents(id) ON DELETE CASCADE,
    output_text TEXT NOT NULL,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_agent_outputs_run ON agent_outputs(agent_run_id);
CREATE INDEX IF NOT EXISTS idx_agent_outputs_agent ON agent_outputs(agent_id, created_at);

CREATE TABLE IF NOT EXISTS proposed_actions (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    justification TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_proposed_actions_project ON proposed_actions(project_id, status);

CREATE TABLE IF NOT EXISTS action_rejections (
    id TEXT PRIMARY KEY,
    proposed_action_id TEXT NOT NULL UNIQUE REFERENCES proposed_actions(id) ON DELETE CASCADE,
    rejection_reason TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS action_tracking (
    id TEXT PRIMARY KEY,
    proposed_action_id TEXT NOT NULL UNIQUE REFERENCES proposed_actions(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'active',
    comments TEXT,
    success_score INTEGER CHECK (success_score IS NULL OR success_score BETWEEN -5 AND 5),
    completed_at DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS api_tokens (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL,
    token_hash TEXT NOT NULL UNIQUE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
";

/// SQLite-backed persistence for projects, agents, runs and proposals.
#[derive(Clone)]
pub struct CouncilStore {
    db: Arc<Mutex<Connection>>,
}

impl CouncilStore {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        if !data_dir.exists() {
            fs::create_dir_all(data_dir).await?;
        }
        restrict_permissions(data_dir, 0o700);

        let db_path = data_dir.join(crate::core::config::DB_FILE);
        let db = Connection::open(&db_path)?;
        restrict_permissions(&db_path, 0o600);
        info!("Opened council store at {}", db_path.display());
        Self::from_connection(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA foreign_keys = ON;")?;
        db.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) {}

/// Fresh in-memory store for tests.
#[cfg(test)]
pub fn test_store() -> CouncilStore {
    CouncilStore::open_in_memory().expect("open in-memory store")
}

#[async_trait]
impl LifecycleComponent for CouncilStore {
    async fn on_init(&mut self) -> Result<()> {
        info!("Council store initializing...");
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        // Runs cannot survive a restart; close out anything left open.
        let swept = self.fail_abandoned_runs().await?;
        if swept > 0 {
            info!("Marked {} abandoned run(s) as failed", swept);
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("Council store shutting down...");
        Ok(())
    }
}
