use crate::application_port::{RefreshTokenError, TokenError};
use crate::domain_model::{AccessToken, RefreshToken};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, Datelike, SecondsFormat, TimeDelta, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha512;
use std::time::Duration;

type HmacSha512 = Hmac<Sha512>;

const SEPARATOR: u8 = b'.';

// RFC 3339 has four-digit years.
const MAX_EXPIRATION_YEAR: i32 = 9999;

/// Mints refresh tokens bound to the signature of one access token.
///
/// Decoded layout is `<expiration>.<signature>` where the expiration is RFC 3339
/// UTC with whole seconds, and the signature is raw HMAC-SHA512 over the
/// expiration text followed by the access token's signature segment.
pub struct RefreshTokenCodec {
    keyed: HmacSha512,
    ttl: Duration,
}

impl RefreshTokenCodec {
    pub fn new(signing_key: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        let keyed = <HmacSha512 as KeyInit>::new_from_slice(signing_key)
            .map_err(|e| TokenError::Encoding(format!("refresh signing key: {e}")))?;
        Ok(RefreshTokenCodec { keyed, ttl })
    }

    pub fn mint(&self, access_token: &AccessToken) -> Result<RefreshToken, TokenError> {
        let expires_at = TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .filter(|instant| instant.year() <= MAX_EXPIRATION_YEAR)
            .ok_or_else(|| {
                TokenError::Encoding(format!("refresh ttl out of range: {:?}", self.ttl))
            })?;
        Ok(self.mint_expiring_at(access_token, expires_at))
    }

    pub fn mint_expiring_at(
        &self,
        access_token: &AccessToken,
        expires_at: DateTime<Utc>,
    ) -> RefreshToken {
        let expiration = format_expiration(expires_at);
        let signature = self.sign(expiration.as_bytes(), access_token);

        let mut payload = Vec::with_capacity(expiration.len() + 1 + signature.len());
        payload.extend_from_slice(expiration.as_bytes());
        payload.push(SEPARATOR);
        payload.extend_from_slice(&signature);
        RefreshToken(URL_SAFE.encode(payload))
    }

    /// Checks the binding to `access_token` first, then the expiration.
    pub fn verify(
        &self,
        refresh_token: &RefreshToken,
        access_token: &AccessToken,
    ) -> Result<(), RefreshTokenError> {
        let decoded = URL_SAFE
            .decode(refresh_token.as_str())
            .map_err(|_| RefreshTokenError::Malformed)?;
        let (expiration, signature) = split_payload(&decoded)?;

        self.mac(expiration, access_token)
            .verify_slice(signature)
            .map_err(|_| RefreshTokenError::InvalidSignature)?;

        let expires_at = parse_expiration(expiration)?;
        if expires_at <= Utc::now() {
            return Err(RefreshTokenError::Expired);
        }
        Ok(())
    }

    fn sign(&self, expiration: &[u8], access_token: &AccessToken) -> Vec<u8> {
        self.mac(expiration, access_token)
            .finalize()
            .into_bytes()
            .to_vec()
    }

    fn mac(&self, expiration: &[u8], access_token: &AccessToken) -> HmacSha512 {
        let mut mac = self.keyed.clone();
        mac.update(expiration);
        mac.update(access_token.signature().as_bytes());
        mac
    }
}

fn format_expiration(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_expiration(text: &[u8]) -> Result<DateTime<Utc>, RefreshTokenError> {
    let text = std::str::from_utf8(text).map_err(|_| RefreshTokenError::Malformed)?;
    let parsed =
        DateTime::parse_from_rfc3339(text).map_err(|_| RefreshTokenError::Malformed)?;
    Ok(parsed.with_timezone(&Utc))
}

// The expiration text never contains the separator; the signature bytes may.
fn split_payload(decoded: &[u8]) -> Result<(&[u8], &[u8]), RefreshTokenError> {
    let idx = decoded
        .iter()
        .position(|b| *b == SEPARATOR)
        .ok_or(RefreshTokenError::Malformed)?;
    let (expiration, rest) = decoded.split_at(idx);
    let signature = &rest[1..];
    if expiration.is_empty() || signature.is_empty() {
        return Err(RefreshTokenError::Malformed);
    }
    Ok((expiration, signature))
}
