//! Walks one user through issue, rotation and a replayed refresh on the
//! in-memory store. No external services needed.

use std::sync::Arc;
use std::time::Duration;
use tokenpair::application_impl::*;
use tokenpair::application_port::*;
use tokenpair::domain_model::UserId;
use tokenpair::domain_port::CredentialStore;
use tokenpair::infra_memory::MemoryCredentialStore;
use tokenpair::logger::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "debug".to_string(),
    })?;

    let store = Arc::new(MemoryCredentialStore::new());
    let credential_store: Arc<dyn CredentialStore> = store.clone();
    let credential_hasher: Arc<dyn CredentialHasher> =
        Arc::new(Argon2CredentialHasher::new(HasherParams::default())?);

    let token_service: Arc<dyn TokenPairService> = Arc::new(RealTokenPairService::new(
        AccessTokenCodec::new(b"demo-access-key", Duration::from_secs(15 * 60)),
        RefreshTokenCodec::new(b"demo-refresh-key", Duration::from_secs(7 * 24 * 60 * 60))?,
        credential_hasher,
        credential_store,
        Duration::from_secs(1),
    ));

    let user_id = UserId::new_random();

    let first = token_service.issue_pair(user_id).await?;
    info!("issued: {}", serde_json::to_string_pretty(&first)?);

    let second = token_service.refresh(&first).await?;
    info!("rotated: {}", serde_json::to_string_pretty(&second)?);

    match token_service.validate_for_refresh(&first).await {
        Err(TokenError::ReuseDetected(id)) => info!(%id, "replay detected, record revoked"),
        other => warn!("unexpected outcome for replay: {:?}", other),
    }
    info!(records = store.len(), "store after replay");

    match token_service.validate_for_refresh(&second).await {
        Err(e) => info!("legitimate pair now rejected: {}", e),
        Ok(id) => warn!(%id, "legitimate pair unexpectedly accepted"),
    }

    Ok(())
}
