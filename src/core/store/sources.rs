use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::CouncilStore;
use super::types::{DataSourceRecord, SealedCredential};

const SOURCE_COLUMNS: &str = "id, project_id, source_type, status, connected_at, created_at";

fn source_from_row(row: &Row<'_>) -> rusqlite::Result<DataSourceRecord> {
    Ok(DataSourceRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        source_type: row.get(2)?,
        status: row.get(3)?,
        connected_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl CouncilStore {
    /// One row per (project, type): reconnecting replaces the credential.
    pub async fn upsert_data_source(
        &self,
        project_id: &str,
        source_type: &str,
        sealed_credential: &str,
    ) -> Result<DataSourceRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO data_sources (id, project_id, source_type, credential, status, connected_at)
             VALUES (?1, ?2, ?3, ?4, 'connected', CURRENT_TIMESTAMP)
             ON CONFLICT(project_id, source_type) DO UPDATE SET
                credential = excluded.credential,
                status = 'connected',
                connected_at = CURRENT_TIMESTAMP",
            params![id, project_id, source_type, sealed_credential],
        )?;
        let rec = db.query_row(
            &format!(
                "SELECT {SOURCE_COLUMNS} FROM data_sources WHERE project_id = ?1 AND source_type = ?2"
            ),
            params![project_id, source_type],
            source_from_row,
        )?;
        Ok(rec)
    }

    pub async fn list_data_sources(&self, project_id: &str) -> Result<Vec<DataSourceRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {SOURCE_COLUMNS} FROM data_sources WHERE project_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![project_id], source_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn get_data_source(&self, id: &str) -> Result<Option<DataSourceRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM data_sources WHERE id = ?1"),
                params![id],
                source_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    pub async fn set_data_source_status(&self, id: &str, status: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE data_sources SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(())
    }

    pub async fn delete_data_source(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM data_sources WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Credentials of every `connected` source of a project, still sealed.
    pub async fn connected_credentials(&self, project_id: &str) -> Result<Vec<SealedCredential>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT source_type, credential FROM data_sources
             WHERE project_id = ?1 AND status = 'connected'
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(SealedCredential {
                source_type: row.get(0)?,
                credential: row.get(1)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
