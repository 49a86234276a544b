use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

/// Process-local store for tests and single-instance dev runs.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: DashMap<UserId, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.records.contains_key(&user_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn upsert(&self, user_id: UserId, token_hash: &str) -> Result<(), StoreError> {
        self.records.insert(user_id, token_hash.to_string());
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<String, StoreError> {
        self.records
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.records.remove(&user_id).is_some())
    }
}
