use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential record not found")]
    NotFound,
    #[error("store operation timed out")]
    Timeout,
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Not-found is a definitive answer; everything else may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StoreError::NotFound)
    }
}

/// Holds the hash of the single currently valid refresh token per user.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create or replace the record for `user_id` in a single atomic call.
    async fn upsert(&self, user_id: UserId, token_hash: &str) -> Result<(), StoreError>;

    /// Fetch the stored hash. Fails with [`StoreError::NotFound`] if absent.
    async fn get(&self, user_id: UserId) -> Result<String, StoreError>;

    /// Remove the record. Returns whether one was present.
    async fn delete(&self, user_id: UserId) -> Result<bool, StoreError>;
}
