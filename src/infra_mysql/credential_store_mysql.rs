use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlCredentialStore {
    pool: MySqlPool,
}

impl MySqlCredentialStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCredentialStore { pool }
    }

    #[inline]
    fn uid_as_bytes(id: &UserId) -> &[u8] {
        id.0.as_bytes()
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS refresh_credential (
    user_id    BINARY(16)   NOT NULL PRIMARY KEY,
    token_hash VARCHAR(255) NOT NULL,
    updated_at TIMESTAMP    NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
)
"#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn upsert(&self, user_id: UserId, token_hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
INSERT INTO refresh_credential (user_id, token_hash)
VALUES (?, ?)
ON DUPLICATE KEY UPDATE token_hash = VALUES(token_hash)
"#,
        )
        .bind(Self::uid_as_bytes(&user_id))
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<String, StoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT token_hash
FROM refresh_credential
WHERE user_id = ?
"#,
        )
        .bind(Self::uid_as_bytes(&user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        let row = row_opt.ok_or(StoreError::NotFound)?;
        row.try_get("token_hash")
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
DELETE FROM refresh_credential
WHERE user_id = ?
"#,
        )
        .bind(Self::uid_as_bytes(&user_id))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
