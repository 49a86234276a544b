use crate::domain_model::*;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

pub struct RedisCredentialStore {
    conn: ConnectionManager,
    prefix: String,
    record_ttl: Duration,
}

impl RedisCredentialStore {
    /// Records expire after `record_ttl`; pass the refresh-token TTL so a record
    /// never outlives the token it guards.
    pub fn new(
        conn: ConnectionManager,
        prefix: impl Into<String>,
        record_ttl: Duration,
    ) -> Self {
        RedisCredentialStore {
            conn,
            prefix: prefix.into(),
            record_ttl,
        }
    }

    fn key(&self, user_id: UserId) -> String {
        record_key(&self.prefix, user_id)
    }

    fn ttl_secs(&self) -> u64 {
        expiry_secs(self.record_ttl)
    }
}

fn record_key(prefix: &str, user_id: UserId) -> String {
    format!("{}:{}", prefix, user_id)
}

// SET EX rejects 0, so sub-second TTLs round up.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait::async_trait]
impl CredentialStore for RedisCredentialStore {
    async fn upsert(&self, user_id: UserId, token_hash: &str) -> Result<(), StoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        // SET overwrites atomically, so there is never more than one record.
        let _: () = conn
            .set_ex(&key, token_hash, self.ttl_secs())
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<String, StoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        val.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, StoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let removed: usize = conn
            .del(&key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(removed > 0)
    }
}
