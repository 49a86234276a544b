use crate::domain_model::*;
use crate::domain_port::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AccessTokenError {
    #[error("access token expired")]
    Expired,
    #[error("access token invalid: {0}")]
    Invalid(String),
    #[error("access token encoding failed: {0}")]
    Encoding(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("refresh token malformed")]
    Malformed,
    #[error("refresh token signature mismatch")]
    InvalidSignature,
    #[error("refresh token expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token invalid: {0}")]
    InvalidToken(String),
    #[error("token expired")]
    Expired,
    #[error("refresh token reuse detected for user {0}")]
    ReuseDetected(UserId),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Only store failures may succeed when the same request is retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TokenError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<AccessTokenError> for TokenError {
    fn from(error: AccessTokenError) -> Self {
        match error {
            AccessTokenError::Expired => TokenError::Expired,
            AccessTokenError::Invalid(reason) => TokenError::InvalidToken(reason),
            AccessTokenError::Encoding(e) => TokenError::Encoding(e),
        }
    }
}

impl From<RefreshTokenError> for TokenError {
    fn from(error: RefreshTokenError) -> Self {
        match error {
            RefreshTokenError::Expired => TokenError::Expired,
            other => TokenError::InvalidToken(other.to_string()),
        }
    }
}

/// Outcome of checking an access token whose signature is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessVerification {
    Valid(AccessClaims),
    Expired(AccessClaims),
}

impl AccessVerification {
    pub fn claims(&self) -> &AccessClaims {
        match self {
            AccessVerification::Valid(claims) | AccessVerification::Expired(claims) => claims,
        }
    }

    pub fn into_claims(self) -> AccessClaims {
        match self {
            AccessVerification::Valid(claims) | AccessVerification::Expired(claims) => claims,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, AccessVerification::Expired(_))
    }
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, secret: &str) -> Result<String, TokenError>;
    /// `Ok(false)` means a genuine mismatch, never a parsing problem.
    async fn verify(&self, secret: &str, hash: &str) -> Result<bool, TokenError>;
}

#[async_trait::async_trait]
pub trait TokenPairService: Send + Sync {
    /// Mint a bound pair and make it the only refreshable pair for `user_id`.
    async fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, TokenError>;
    /// Check a presented pair. A hash mismatch revokes the user's record.
    async fn validate_for_refresh(&self, pair: &TokenPair) -> Result<UserId, TokenError>;
    /// Validate then rotate.
    async fn refresh(&self, pair: &TokenPair) -> Result<TokenPair, TokenError>;
}
