use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::CouncilStore;
use super::types::{ProjectPatch, ProjectRecord};

const PROJECT_COLUMNS: &str =
    "id, owner_id, name, description, image_url, created_at, updated_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        image_url: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl CouncilStore {
    pub async fn create_project(
        &self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<ProjectRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO projects (id, owner_id, name, description, image_url) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, owner_id, name, description, image_url],
        )?;
        let rec = db.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )?;
        Ok(rec)
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    pub async fn list_projects(&self, owner_id: &str) -> Result<Vec<ProjectRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], project_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn update_project(
        &self,
        id: &str,
        patch: &ProjectPatch,
    ) -> Result<Option<ProjectRecord>> {
        let db = self.db.lock().await;
        let tx = db.unchecked_transaction()?;
        if let Some(name) = &patch.name {
            tx.execute(
                "UPDATE projects SET name = ?1 WHERE id = ?2",
                params![name, id],
            )?;
        }
        if let Some(description) = &patch.description {
            tx.execute(
                "UPDATE projects SET description = ?1 WHERE id = ?2",
                params![description, id],
            )?;
        }
        if let Some(image_url) = &patch.image_url {
            tx.execute(
                "UPDATE projects SET image_url = ?1 WHERE id = ?2",
                params![image_url, id],
            )?;
        }
        tx.execute(
            "UPDATE projects SET updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            params![id],
        )?;
        let rec = tx
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;
        tx.commit()?;
        Ok(rec)
    }

    /// Deletes the project and, through cascading keys, everything it owns.
    pub async fn delete_project(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
