use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;

/// Owns every long-lived handle. Built once at start-up, closed by [`Server::shutdown`].
pub struct Server {
    pub token_service: Arc<dyn TokenPairService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        settings.validate()?;

        let mut pool = None;
        let credential_store: Arc<dyn CredentialStore> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryCredentialStore::new()),
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.redis_dsn is required"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisCredentialStore::new(
                    redis_manager,
                    settings.store.key_prefix.clone(),
                    settings.token.refresh_ttl(),
                ))
            }
            "mysql" => {
                let dsn = settings
                    .store
                    .mysql_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("store.mysql_dsn is required"))?;
                let mysql_pool = Pool::<MySql>::connect(dsn).await?;
                let store = MySqlCredentialStore::new(mysql_pool.clone());
                store.ensure_schema().await?;
                pool = Some(mysql_pool);
                Arc::new(store)
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2CredentialHasher::new(HasherParams {
                memory_kib: settings.hasher.memory_kib,
                iterations: settings.hasher.iterations,
                parallelism: settings.hasher.parallelism,
            })?);

        let access_codec = AccessTokenCodec::new(
            settings.token.access_key.as_bytes(),
            settings.token.access_ttl(),
        );
        let refresh_codec = RefreshTokenCodec::new(
            settings.token.refresh_key.as_bytes(),
            settings.token.refresh_ttl(),
        )?;

        let token_service: Arc<dyn TokenPairService> = Arc::new(RealTokenPairService::new(
            access_codec,
            refresh_codec,
            credential_hasher,
            credential_store,
            settings.store.timeout(),
        ));

        info!(backend = %settings.store.backend, "server started");

        Ok(Self {
            token_service,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("mysql pool closed");
        }
    }
}
