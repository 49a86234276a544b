use crate::application_impl::{AccessTokenCodec, RefreshTokenCodec};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub struct RealTokenPairService {
    access_codec: AccessTokenCodec,
    refresh_codec: RefreshTokenCodec,
    credential_hasher: Arc<dyn CredentialHasher>,
    credential_store: Arc<dyn CredentialStore>,
    store_timeout: Duration,
}

impl RealTokenPairService {
    pub fn new(
        access_codec: AccessTokenCodec,
        refresh_codec: RefreshTokenCodec,
        credential_hasher: Arc<dyn CredentialHasher>,
        credential_store: Arc<dyn CredentialStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            access_codec,
            refresh_codec,
            credential_hasher,
            credential_store,
            store_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn revoke_on_reuse(&self, user_id: UserId) -> Result<(), TokenError> {
        warn!(
            %user_id,
            security_event = "refresh_token_reuse",
            "superseded refresh token presented, revoking credential"
        );
        match self.bounded(self.credential_store.delete(user_id)).await {
            Ok(was_present) => {
                debug!(%user_id, was_present, "credential record deleted");
                Ok(())
            }
            Err(e) => {
                error!(%user_id, error = %e, "failed to revoke credential after reuse");
                Err(e.into())
            }
        }
    }
}

#[async_trait::async_trait]
impl TokenPairService for RealTokenPairService {
    async fn issue_pair(&self, user_id: UserId) -> Result<TokenPair, TokenError> {
        let access_token = self.access_codec.mint(user_id)?;
        let refresh_token = self.refresh_codec.mint(&access_token)?;

        let token_hash = self.credential_hasher.hash(refresh_token.as_str()).await?;
        // Replaces whatever pair was issued before.
        self.bounded(self.credential_store.upsert(user_id, &token_hash))
            .await?;

        debug!(%user_id, "issued token pair");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn validate_for_refresh(&self, pair: &TokenPair) -> Result<UserId, TokenError> {
        // The access token has usually expired by now; only its signature matters.
        let claims = self.access_codec.verify(&pair.access_token)?.into_claims();
        let user_id = claims.user_uuid;

        self.refresh_codec
            .verify(&pair.refresh_token, &pair.access_token)?;

        let stored_hash = match self.bounded(self.credential_store.get(user_id)).await {
            Ok(hash) => hash,
            Err(StoreError::NotFound) => {
                return Err(TokenError::InvalidToken(format!(
                    "no credential record for user {}",
                    user_id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let matches = self
            .credential_hasher
            .verify(pair.refresh_token.as_str(), &stored_hash)
            .await?;
        if matches {
            return Ok(user_id);
        }

        // Cryptographically genuine but superseded: someone already rotated it.
        self.revoke_on_reuse(user_id).await?;
        Err(TokenError::ReuseDetected(user_id))
    }

    async fn refresh(&self, pair: &TokenPair) -> Result<TokenPair, TokenError> {
        let user_id = self.validate_for_refresh(pair).await?;
        self.issue_pair(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::{Argon2CredentialHasher, HasherParams};
    use crate::infra_memory::MemoryCredentialStore;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE;
    use chrono::{Duration as ChronoDuration, Utc};

    const ACCESS_KEY: &[u8] = b"access-key-for-tests";
    const REFRESH_KEY: &[u8] = b"refresh-key-for-tests";

    fn hasher() -> Arc<dyn CredentialHasher> {
        Arc::new(
            Argon2CredentialHasher::new(HasherParams {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            })
            .expect("hasher"),
        )
    }

    fn service_with(store: Arc<dyn CredentialStore>, timeout: Duration) -> RealTokenPairService {
        RealTokenPairService::new(
            AccessTokenCodec::new(ACCESS_KEY, Duration::from_secs(900)),
            RefreshTokenCodec::new(REFRESH_KEY, Duration::from_secs(3600)).expect("codec"),
            hasher(),
            store,
            timeout,
        )
    }

    fn service() -> (RealTokenPairService, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        (service_with(store.clone(), Duration::from_secs(1)), store)
    }

    struct SlowStore {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl CredentialStore for SlowStore {
        async fn upsert(&self, _user_id: UserId, _token_hash: &str) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn get(&self, _user_id: UserId) -> Result<String, StoreError> {
            tokio::time::sleep(self.delay).await;
            Err(StoreError::NotFound)
        }

        async fn delete(&self, _user_id: UserId) -> Result<bool, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(false)
        }
    }

    /// Remembers the hash it was given but refuses to delete.
    struct StickyStore {
        inner: MemoryCredentialStore,
    }

    #[async_trait::async_trait]
    impl CredentialStore for StickyStore {
        async fn upsert(&self, user_id: UserId, token_hash: &str) -> Result<(), StoreError> {
            self.inner.upsert(user_id, token_hash).await
        }

        async fn get(&self, user_id: UserId) -> Result<String, StoreError> {
            self.inner.get(user_id).await
        }

        async fn delete(&self, _user_id: UserId) -> Result<bool, StoreError> {
            Err(StoreError::Backend("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn issued_pair_validates_for_same_user() {
        let (service, store) = service();
        let user = UserId::new_random();

        let pair = service.issue_pair(user).await.expect("issue");
        assert!(store.contains(user));

        let validated = service.validate_for_refresh(&pair).await.expect("validate");
        assert_eq!(validated, user);
    }

    #[tokio::test]
    async fn store_holds_hash_not_token() {
        let (service, store) = service();
        let user = UserId::new_random();

        let pair = service.issue_pair(user).await.expect("issue");
        let stored = store.get(user).await.expect("record");
        assert_ne!(stored, pair.refresh_token.0);
        assert!(stored.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn refresh_token_is_bound_to_its_access_token() {
        let (service, store) = service();
        let user = UserId::new_random();

        let first = service.issue_pair(user).await.expect("issue");
        let second = service.issue_pair(user).await.expect("issue");
        let crossed = TokenPair {
            access_token: second.access_token.clone(),
            refresh_token: first.refresh_token.clone(),
        };

        let result = service.validate_for_refresh(&crossed).await;
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
        // Binding failures never revoke.
        assert!(store.contains(user));
        assert!(service.validate_for_refresh(&second).await.is_ok());
    }

    #[tokio::test]
    async fn tampered_refresh_signature_is_invalid() {
        let (service, store) = service();
        let user = UserId::new_random();
        let pair = service.issue_pair(user).await.expect("issue");

        let mut bytes = URL_SAFE.decode(pair.refresh_token.as_str()).expect("decode");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let tampered = TokenPair {
            access_token: pair.access_token.clone(),
            refresh_token: RefreshToken(URL_SAFE.encode(bytes)),
        };

        let result = service.validate_for_refresh(&tampered).await;
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
        assert!(store.contains(user));
    }

    #[tokio::test]
    async fn garbage_access_token_is_invalid() {
        let (service, _) = service();
        let pair = TokenPair {
            access_token: AccessToken("garbage".to_string()),
            refresh_token: RefreshToken("garbage".to_string()),
        };
        let result = service.validate_for_refresh(&pair).await;
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn expired_access_token_still_anchors_refresh() {
        let (service, store) = service();
        let user = UserId::new_random();

        let access = service
            .access_codec
            .mint_expiring_at(user, Utc::now() - ChronoDuration::minutes(5))
            .expect("mint");
        let refresh = service.refresh_codec.mint(&access).expect("mint");
        let hash = service
            .credential_hasher
            .hash(refresh.as_str())
            .await
            .expect("hash");
        store.upsert(user, &hash).await.expect("upsert");

        let pair = TokenPair {
            access_token: access,
            refresh_token: refresh,
        };
        let validated = service.validate_for_refresh(&pair).await.expect("validate");
        assert_eq!(validated, user);
    }

    #[tokio::test]
    async fn expired_refresh_token_is_expired() {
        let (service, store) = service();
        let user = UserId::new_random();

        let access = service.access_codec.mint(user).expect("mint");
        let refresh = service
            .refresh_codec
            .mint_expiring_at(&access, Utc::now() - ChronoDuration::seconds(1));
        let hash = service
            .credential_hasher
            .hash(refresh.as_str())
            .await
            .expect("hash");
        store.upsert(user, &hash).await.expect("upsert");

        let pair = TokenPair {
            access_token: access,
            refresh_token: refresh,
        };
        let result = service.validate_for_refresh(&pair).await;
        assert!(matches!(result, Err(TokenError::Expired)));
        assert!(store.contains(user));
    }

    #[tokio::test]
    async fn missing_record_is_invalid_not_reuse() {
        let (service, store) = service();
        let user = UserId::new_random();
        let pair = service.issue_pair(user).await.expect("issue");
        store.delete(user).await.expect("delete");

        let result = service.validate_for_refresh(&pair).await;
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn superseded_pair_is_reuse_and_revokes() {
        let (service, store) = service();
        let user = UserId::new_random();

        let old = service.issue_pair(user).await.expect("issue");
        let new = service.refresh(&old).await.expect("refresh");

        let result = service.validate_for_refresh(&old).await;
        assert!(matches!(result, Err(TokenError::ReuseDetected(u)) if u == user));
        assert!(!store.contains(user));

        let result = service.validate_for_refresh(&new).await;
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn reuse_with_failed_revocation_surfaces_store_error() {
        let store = Arc::new(StickyStore {
            inner: MemoryCredentialStore::new(),
        });
        let service = service_with(store.clone(), Duration::from_secs(1));
        let user = UserId::new_random();

        let old = service.issue_pair(user).await.expect("issue");
        service.issue_pair(user).await.expect("issue");

        let result = service.validate_for_refresh(&old).await;
        assert!(matches!(result, Err(TokenError::Store(StoreError::Backend(_)))));
        assert!(result.err().is_some_and(|e| e.is_retryable()));
    }

    #[tokio::test]
    async fn out_of_range_ttl_fails_issue_without_writing() {
        let store = Arc::new(MemoryCredentialStore::new());
        let service = RealTokenPairService::new(
            AccessTokenCodec::new(ACCESS_KEY, Duration::from_secs(900)),
            RefreshTokenCodec::new(REFRESH_KEY, Duration::from_secs(u64::MAX)).expect("codec"),
            hasher(),
            store.clone(),
            Duration::from_secs(1),
        );

        let result = service.issue_pair(UserId::new_random()).await;
        assert!(matches!(result, Err(TokenError::Encoding(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn slow_store_write_times_out() {
        let store = Arc::new(SlowStore {
            delay: Duration::from_millis(500),
        });
        let service = service_with(store, Duration::from_millis(20));

        let result = service.issue_pair(UserId::new_random()).await;
        assert!(matches!(result, Err(TokenError::Store(StoreError::Timeout))));
        assert!(result.err().is_some_and(|e| e.is_retryable()));
    }

    #[tokio::test]
    async fn slow_store_lookup_times_out() {
        let store = Arc::new(SlowStore {
            delay: Duration::from_millis(500),
        });
        let service = service_with(store, Duration::from_millis(20));
        let user = UserId::new_random();

        let access = service.access_codec.mint(user).expect("mint");
        let refresh = service.refresh_codec.mint(&access).expect("mint");
        let pair = TokenPair {
            access_token: access,
            refresh_token: refresh,
        };
        let result = service.validate_for_refresh(&pair).await;
        assert!(matches!(result, Err(TokenError::Store(StoreError::Timeout))));
    }
}
