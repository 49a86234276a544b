use crate::domain_model::UserId;
use serde::{Deserialize, Serialize};

/// Compact JWT text: `header.payload.signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(pub String);

impl AccessToken {
    /// The base64url signature segment, i.e. everything after the last `.`.
    ///
    /// Refresh tokens are bound to these bytes, not to the user id.
    pub fn signature(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// base64url(`<expiration-text>.<raw-signature-bytes>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken(pub String);

impl RefreshToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_uuid: UserId,
    pub exp: i64,
    /// Unique per mint, so two pairs issued within one second never collide.
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}
