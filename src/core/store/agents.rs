use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::CouncilStore;
use super::types::{AgentRecord, NewAgent};

const AGENT_COLUMNS: &str =
    "id, project_id, name, agent_type, system_prompt, is_default, created_at, updated_at";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        agent_type: row.get(3)?,
        system_prompt: row.get(4)?,
        is_default: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl CouncilStore {
    /// Inserts every agent in one transaction, in the given order.
    pub async fn insert_agents(
        &self,
        project_id: &str,
        agents: &[NewAgent],
    ) -> Result<Vec<AgentRecord>> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(agents.len());
        for agent in agents {
            let id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO agents (id, project_id, name, agent_type, system_prompt, is_default)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    project_id,
                    agent.name,
                    agent.agent_type,
                    agent.system_prompt,
                    agent.is_default as i64
                ],
            )?;
            ids.push(id);
        }
        let mut out = Vec::with_capacity(ids.len());
        for id in &ids {
            out.push(tx.query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )?);
        }
        tx.commit()?;
        Ok(out)
    }

    pub async fn get_agent(&self, id: &str) -> Result<Option<AgentRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Agents of a project in creation order.
    pub async fn list_agents(&self, project_id: &str) -> Result<Vec<AgentRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE project_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![project_id], agent_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn count_default_agents(&self, project_id: &str) -> Result<i64> {
        let db = self.db.lock().await;
        let count = db.query_row(
            "SELECT COUNT(*) FROM agents WHERE project_id = ?1 AND is_default = 1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub async fn update_agent(
        &self,
        id: &str,
        name: &str,
        agent_type: &str,
        system_prompt: &str,
    ) -> Result<Option<AgentRecord>> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE agents SET name = ?1, agent_type = ?2, system_prompt = ?3, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?4",
            params![name, agent_type, system_prompt, id],
        )?;
        let rec = db
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Deletes a non-default agent. Default rows are left untouched.
    pub async fn delete_custom_agent(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "DELETE FROM agents WHERE id = ?1 AND is_default = 0",
            params![id],
        )?;
        Ok(rows > 0)
    }
}
