use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::CouncilStore;
use super::types::{OutputRecord, RunRecord};

const RUN_COLUMNS: &str =
    "id, project_id, run_type, status, started_at, completed_at, error_message";
const OUTPUT_COLUMNS: &str = "id, agent_run_id, agent_id, output_text, metadata_json, created_at";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        run_type: row.get(2)?,
        status: row.get(3)?,
        started_at: row.get(4)?,
        completed_at: row.get(5)?,
        error_message: row.get(6)?,
    })
}

fn output_from_row(row: &Row<'_>) -> rusqlite::Result<OutputRecord> {
    let metadata_json: String = row.get(4)?;
    Ok(OutputRecord {
        id: row.get(0)?,
        agent_run_id: row.get(1)?,
        agent_id: row.get(2)?,
        output_text: row.get(3)?,
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::Value::Null),
        created_at: row.get(5)?,
    })
}

/// Shared by plain inserts and the synthesis transaction.
pub(super) fn write_output(
    conn: &Connection,
    run_id: &str,
    agent_id: &str,
    output_text: &str,
    metadata: &serde_json::Value,
) -> Result<OutputRecord> {
    let id = uuid::Uuid::new_v4().to_string();
    let metadata_json = serde_json::to_string(metadata)?;
    conn.execute(
        "INSERT INTO agent_outputs (id, agent_run_id, agent_id, output_text, metadata_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, run_id, agent_id, output_text, metadata_json],
    )?;
    let rec = conn.query_row(
        &format!("SELECT {OUTPUT_COLUMNS} FROM agent_outputs WHERE id = ?1"),
        params![id],
        output_from_row,
    )?;
    Ok(rec)
}

impl CouncilStore {
    /// Opens a run in `running` state.
    pub async fn create_run(&self, project_id: &str, run_type: &str) -> Result<RunRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO agent_runs (id, project_id, run_type, status) VALUES (?1, ?2, ?3, 'running')",
            params![id, project_id, run_type],
        )?;
        let rec = db.query_row(
            &format!("SELECT {RUN_COLUMNS} FROM agent_runs WHERE id = ?1"),
            params![id],
            run_from_row,
        )?;
        Ok(rec)
    }

    /// Moves an open run to a terminal status. Returns false when the run was
    /// already terminal, leaving it untouched.
    pub async fn finalize_run(
        &self,
        id: &str,
        status: &str,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE agent_runs SET status = ?1, error_message = ?2, completed_at = CURRENT_TIMESTAMP
             WHERE id = ?3 AND status IN ('pending', 'running')",
            params![status, error_message, id],
        )?;
        Ok(rows > 0)
    }

    pub(super) async fn fail_abandoned_runs(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE agent_runs SET status = 'failed', error_message = 'Interrupted by restart',
                completed_at = CURRENT_TIMESTAMP
             WHERE status IN ('pending', 'running')",
            [],
        )?;
        Ok(rows)
    }

    pub async fn get_run(&self, id: &str) -> Result<Option<RunRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {RUN_COLUMNS} FROM agent_runs WHERE id = ?1"),
                params![id],
                run_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Most recent runs first.
    pub async fn list_runs(&self, project_id: &str, limit: usize) -> Result<Vec<RunRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {RUN_COLUMNS} FROM agent_runs WHERE project_id = ?1
             ORDER BY started_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![project_id, limit as i64], run_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn insert_output(
        &self,
        run_id: &str,
        agent_id: &str,
        output_text: &str,
        metadata: &serde_json::Value,
    ) -> Result<OutputRecord> {
        let db = self.db.lock().await;
        write_output(&db, run_id, agent_id, output_text, metadata)
    }

    /// Outputs of one run in insertion order.
    pub async fn list_outputs_by_run(&self, run_id: &str) -> Result<Vec<OutputRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {OUTPUT_COLUMNS} FROM agent_outputs WHERE agent_run_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![run_id], output_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Newest outputs of one agent first.
    pub async fn list_outputs_by_agent(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<OutputRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {OUTPUT_COLUMNS} FROM agent_outputs WHERE agent_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![agent_id, limit as i64], output_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Number of analysis outputs per agent name across a project.
    pub async fn analysis_output_counts(&self, project_id: &str) -> Result<Vec<(String, i64)>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT a.name, COUNT(o.id) FROM agent_outputs o
             JOIN agent_runs r ON r.id = o.agent_run_id
             JOIN agents a ON a.id = o.agent_id
             WHERE r.project_id = ?1 AND r.run_type = 'agent_analysis'
             GROUP BY a.id, a.name
             ORDER BY a.name ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
