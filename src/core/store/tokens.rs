use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::CouncilStore;
use super::types::ApiTokenRecord;

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_raw_token() -> String {
    let bytes: [u8; 24] = rand::random();
    format!("pmc_{}", hex::encode(bytes))
}

impl CouncilStore {
    /// Mints a token for `owner_id`. Only the hash is stored; the raw value is
    /// returned once.
    pub async fn create_api_token(
        &self,
        owner_id: &str,
        name: &str,
    ) -> Result<(String, ApiTokenRecord)> {
        let raw_token = generate_raw_token();
        let token_hash = hash_token(&raw_token);
        let id = uuid::Uuid::new_v4().to_string();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO api_tokens (id, owner_id, name, token_hash) VALUES (?1, ?2, ?3, ?4)",
            params![id, owner_id, name, token_hash],
        )?;
        let created_at = db.query_row(
            "SELECT created_at FROM api_tokens WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )?;

        Ok((
            raw_token,
            ApiTokenRecord {
                id,
                owner_id: owner_id.to_string(),
                name: name.to_string(),
                created_at,
            },
        ))
    }

    /// Owner the token was minted for, if it is known.
    pub async fn resolve_api_token(&self, raw_token: &str) -> Result<Option<String>> {
        let token_hash = hash_token(raw_token);
        let db = self.db.lock().await;
        let owner = db
            .query_row(
                "SELECT owner_id FROM api_tokens WHERE token_hash = ?1",
                params![token_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    pub async fn has_any_api_tokens(&self) -> Result<bool> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row("SELECT COUNT(*) FROM api_tokens", [], |row| row.get(0))?;
        Ok(count > 0)
    }
}
