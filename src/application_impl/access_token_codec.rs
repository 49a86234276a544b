use crate::application_port::{AccessTokenError, AccessVerification};
use crate::domain_model::{AccessClaims, AccessToken, UserId};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::Duration;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Signs and checks HS512 access tokens.
///
/// Expiry is evaluated here rather than by `jsonwebtoken`, so an expired token
/// with a good signature still yields its claims.
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl AccessTokenCodec {
    pub fn new(signing_key: &[u8], ttl: Duration) -> Self {
        AccessTokenCodec {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            ttl,
        }
    }

    pub fn mint(&self, user_id: UserId) -> Result<AccessToken, AccessTokenError> {
        let expires_at = TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AccessTokenError::Encoding(format!("ttl out of range: {:?}", self.ttl))
            })?;
        self.mint_expiring_at(user_id, expires_at)
    }

    pub fn mint_expiring_at(
        &self,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessToken, AccessTokenError> {
        let claims = AccessClaims {
            user_uuid: user_id,
            exp: expires_at.timestamp(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AccessTokenError::Encoding(e.to_string()))?;
        Ok(AccessToken(token))
    }

    /// Fails only when the token cannot be trusted at all: bad encoding, an
    /// algorithm other than HS512, or a signature mismatch.
    pub fn verify(&self, token: &AccessToken) -> Result<AccessVerification, AccessTokenError> {
        let data = decode::<AccessClaims>(token.as_str(), &self.decoding_key, &Self::validation())
            .map_err(|e| AccessTokenError::Invalid(e.to_string()))?;
        let claims = data.claims;
        if claims.exp <= Utc::now().timestamp() {
            Ok(AccessVerification::Expired(claims))
        } else {
            Ok(AccessVerification::Valid(claims))
        }
    }

    pub fn verify_unexpired(&self, token: &AccessToken) -> Result<AccessClaims, AccessTokenError> {
        match self.verify(token)? {
            AccessVerification::Valid(claims) => Ok(claims),
            AccessVerification::Expired(_) => Err(AccessTokenError::Expired),
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn validation() -> Validation {
        let mut v = Validation::new(ALGORITHM);
        v.validate_exp = false;
        v.validate_aud = false;
        v.leeway = 0;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Duration as ChronoDuration;

    const KEY: &[u8] = b"access-test-key";

    fn codec() -> AccessTokenCodec {
        AccessTokenCodec::new(KEY, Duration::from_secs(900))
    }

    #[test]
    fn fresh_token_verifies_as_valid() {
        let codec = codec();
        let user = UserId::new_random();
        let token = codec.mint(user).expect("mint");

        let outcome = codec.verify(&token).expect("verify");
        assert!(!outcome.is_expired());
        assert_eq!(outcome.claims().user_uuid, user);
        assert_eq!(token.as_str().split('.').count(), 3);
    }

    #[test]
    fn header_declares_hs512() {
        let token = codec().mint(UserId::new_random()).expect("mint");
        let header = jsonwebtoken::decode_header(token.as_str()).expect("header");
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn expired_token_still_yields_claims() {
        let codec = codec();
        let user = UserId::new_random();
        let token = codec
            .mint_expiring_at(user, Utc::now() - ChronoDuration::hours(1))
            .expect("mint");

        let outcome = codec.verify(&token).expect("signature is still valid");
        assert!(outcome.is_expired());
        assert_eq!(outcome.into_claims().user_uuid, user);

        assert!(matches!(
            codec.verify_unexpired(&token),
            Err(AccessTokenError::Expired)
        ));
    }

    #[test]
    fn back_to_back_mints_differ() {
        let codec = codec();
        let user = UserId::new_random();
        let a = codec.mint(user).expect("mint");
        let b = codec.mint(user).expect("mint");
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn overflowing_ttl_is_an_encoding_error() {
        let codec = AccessTokenCodec::new(KEY, Duration::from_secs(u64::MAX));
        assert!(matches!(
            codec.mint(UserId::new_random()),
            Err(AccessTokenError::Encoding(_))
        ));
    }

    #[test]
    fn other_key_is_rejected() {
        let token = codec().mint(UserId::new_random()).expect("mint");
        let other = AccessTokenCodec::new(b"some-other-key", Duration::from_secs(900));
        assert!(matches!(
            other.verify(&token),
            Err(AccessTokenError::Invalid(_))
        ));
    }

    #[test]
    fn hs256_token_with_same_key_is_rejected() {
        let claims = AccessClaims {
            user_uuid: UserId::new_random(),
            exp: (Utc::now() + ChronoDuration::hours(1)).timestamp(),
            jti: "fixed".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(KEY),
        )
        .expect("encode");

        assert!(matches!(
            codec().verify(&AccessToken(token)),
            Err(AccessTokenError::Invalid(_))
        ));
    }

    #[test]
    fn unsigned_none_token_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&serde_json::json!({
                "user_uuid": UserId::new_random(),
                "exp": (Utc::now() + ChronoDuration::hours(1)).timestamp(),
                "jti": "fixed",
            }))
            .expect("payload"),
        );
        let token = AccessToken(format!("{header}.{payload}."));

        assert!(matches!(
            codec().verify(&token),
            Err(AccessTokenError::Invalid(_))
        ));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let codec = codec();
        let token = codec.mint(UserId::new_random()).expect("mint");
        let tampered = AccessToken(format!("{}blahblahblah", token.as_str()));
        assert!(matches!(
            codec.verify(&tampered),
            Err(AccessTokenError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            codec().verify(&AccessToken("halfkbdlfaglivbkuerfybdah".to_string())),
            Err(AccessTokenError::Invalid(_))
        ));
    }
}
