use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::CouncilStore;
use super::runs::write_output;
use super::types::{
    ActionRecord, NewAction, OutputRecord, RejectionRecord, RejectionSummary, TrackingRecord,
    TrackingWrite,
};

const ACTION_COLUMNS: &str = "id, project_id, title, description, justification, status, created_at";
const TRACKING_COLUMNS: &str = "id, proposed_action_id, status, comments, success_score, completed_at, created_at, updated_at";

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<ActionRecord> {
    Ok(ActionRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        justification: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn tracking_from_row(row: &Row<'_>) -> rusqlite::Result<TrackingRecord> {
    Ok(TrackingRecord {
        id: row.get(0)?,
        proposed_action_id: row.get(1)?,
        status: row.get(2)?,
        comments: row.get(3)?,
        success_score: row.get(4)?,
        completed_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn write_actions(
    conn: &Connection,
    project_id: &str,
    actions: &[NewAction],
) -> Result<Vec<ActionRecord>> {
    let mut out = Vec::with_capacity(actions.len());
    for action in actions {
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO proposed_actions (id, project_id, title, description, justification, status)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
            params![
                id,
                project_id,
                action.title,
                action.description,
                action.justification
            ],
        )?;
        out.push(conn.query_row(
            &format!("SELECT {ACTION_COLUMNS} FROM proposed_actions WHERE id = ?1"),
            params![id],
            action_from_row,
        )?);
    }
    Ok(out)
}

impl CouncilStore {
    /// Inserts a batch atomically, all `pending`.
    #[cfg(test)]
    pub async fn insert_actions(
        &self,
        project_id: &str,
        actions: &[NewAction],
    ) -> Result<Vec<ActionRecord>> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        let out = write_actions(&tx, project_id, actions)?;
        tx.commit()?;
        Ok(out)
    }

    /// Records the synthesis output and its pending actions in one
    /// transaction. Nothing is kept if either write fails.
    pub async fn insert_synthesis_result(
        &self,
        project_id: &str,
        run_id: &str,
        agent_id: &str,
        output_text: &str,
        metadata: &serde_json::Value,
        actions: &[NewAction],
    ) -> Result<(OutputRecord, Vec<ActionRecord>)> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        let output = write_output(&tx, run_id, agent_id, output_text, metadata)?;
        let inserted = write_actions(&tx, project_id, actions)?;
        tx.commit()?;
        Ok((output, inserted))
    }

    pub async fn get_action(&self, id: &str) -> Result<Option<ActionRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {ACTION_COLUMNS} FROM proposed_actions WHERE id = ?1"),
                params![id],
                action_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Newest first, optionally filtered by status.
    pub async fn list_actions(
        &self,
        project_id: &str,
        status: Option<&str>,
    ) -> Result<Vec<ActionRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM proposed_actions
             WHERE project_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![project_id, status], action_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Marks the action accepted and ensures exactly one tracking row exists.
    /// Returns `None` when the action is neither pending nor already accepted.
    pub async fn accept_action(&self, action_id: &str) -> Result<Option<TrackingRecord>> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE proposed_actions SET status = 'accepted', updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status IN ('pending', 'accepted')",
            params![action_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        tx.execute(
            "INSERT OR IGNORE INTO action_tracking (id, proposed_action_id, status)
             VALUES (?1, ?2, 'active')",
            params![uuid::Uuid::new_v4().to_string(), action_id],
        )?;
        let tracking = tx.query_row(
            &format!("SELECT {TRACKING_COLUMNS} FROM action_tracking WHERE proposed_action_id = ?1"),
            params![action_id],
            tracking_from_row,
        )?;
        tx.commit()?;
        Ok(Some(tracking))
    }

    /// Moves a pending action to rejected and records the reason in the same
    /// transaction. Returns `None` when the action was not pending.
    pub async fn reject_action(
        &self,
        action_id: &str,
        reason: &str,
    ) -> Result<Option<RejectionRecord>> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE proposed_actions SET status = 'rejected', updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status = 'pending'",
            params![action_id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        let id = uuid::Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO action_rejections (id, proposed_action_id, rejection_reason) VALUES (?1, ?2, ?3)",
            params![id, action_id, reason],
        )?;
        let rec = tx.query_row(
            "SELECT id, proposed_action_id, rejection_reason, created_at FROM action_rejections WHERE id = ?1",
            params![id],
            |row| {
                Ok(RejectionRecord {
                    id: row.get(0)?,
                    proposed_action_id: row.get(1)?,
                    rejection_reason: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )?;
        tx.commit()?;
        Ok(Some(rec))
    }

    pub async fn get_rejection_for_action(
        &self,
        action_id: &str,
    ) -> Result<Option<RejectionRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                "SELECT id, proposed_action_id, rejection_reason, created_at
                 FROM action_rejections WHERE proposed_action_id = ?1",
                params![action_id],
                |row| {
                    Ok(RejectionRecord {
                        id: row.get(0)?,
                        proposed_action_id: row.get(1)?,
                        rejection_reason: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(rec)
    }

    /// Most recent rejections of a project, newest first.
    pub async fn recent_rejections(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<RejectionSummary>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT r.proposed_action_id, a.title, r.rejection_reason, r.created_at
             FROM action_rejections r
             JOIN proposed_actions a ON a.id = r.proposed_action_id
             WHERE a.project_id = ?1
             ORDER BY r.created_at DESC, r.rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![project_id, limit as i64], |row| {
            Ok(RejectionSummary {
                proposed_action_id: row.get(0)?,
                title: row.get(1)?,
                rejection_reason: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn get_tracking(&self, id: &str) -> Result<Option<TrackingRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {TRACKING_COLUMNS} FROM action_tracking WHERE id = ?1"),
                params![id],
                tracking_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    pub async fn get_tracking_for_action(&self, action_id: &str) -> Result<Option<TrackingRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!(
                    "SELECT {TRACKING_COLUMNS} FROM action_tracking WHERE proposed_action_id = ?1"
                ),
                params![action_id],
                tracking_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    pub async fn list_tracking(&self, project_id: &str) -> Result<Vec<TrackingRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT t.id, t.proposed_action_id, t.status, t.comments, t.success_score,
                    t.completed_at, t.created_at, t.updated_at
             FROM action_tracking t
             JOIN proposed_actions a ON a.id = t.proposed_action_id
             WHERE a.project_id = ?1
             ORDER BY t.created_at DESC, t.rowid DESC",
        )?;
        let rows = stmt.query_map(params![project_id], tracking_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Applies comments and score first, then completion. `completed_at` is
    /// only stamped if it was never set.
    pub async fn write_tracking(
        &self,
        id: &str,
        write: &TrackingWrite,
    ) -> Result<Option<TrackingRecord>> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        if let Some(comments) = &write.comments {
            tx.execute(
                "UPDATE action_tracking SET comments = ?1 WHERE id = ?2",
                params![comments, id],
            )?;
        }
        if let Some(score) = &write.success_score {
            tx.execute(
                "UPDATE action_tracking SET success_score = ?1 WHERE id = ?2",
                params![score, id],
            )?;
        }
        if write.complete {
            tx.execute(
                "UPDATE action_tracking SET status = 'completed',
                    completed_at = COALESCE(completed_at, CURRENT_TIMESTAMP)
                 WHERE id = ?1",
                params![id],
            )?;
        }
        tx.execute(
            "UPDATE action_tracking SET updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            params![id],
        )?;
        let rec = tx
            .query_row(
                &format!("SELECT {TRACKING_COLUMNS} FROM action_tracking WHERE id = ?1"),
                params![id],
                tracking_from_row,
            )
            .optional()?;
        tx.commit()?;
        Ok(rec)
    }
}
