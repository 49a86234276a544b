use crate::application_port::{CredentialHasher, TokenError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

#[derive(Debug, Clone, Copy)]
pub struct HasherParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HasherParams {
    fn default() -> Self {
        HasherParams {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Argon2id with a fresh salt per hash.
pub struct Argon2CredentialHasher {
    argon2: Argon2<'static>,
}

impl Argon2CredentialHasher {
    pub fn new(params: HasherParams) -> Result<Self, TokenError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            None,
        )
        .map_err(|e| TokenError::Encoding(format!("argon2 params: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

fn hash_blocking(argon2: &Argon2<'static>, secret: &str) -> Result<String, TokenError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| TokenError::Encoding(e.to_string()))?
        .to_string();
    Ok(hash)
}

fn verify_blocking(
    argon2: &Argon2<'static>,
    secret: &str,
    hash: &str,
) -> Result<bool, TokenError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| TokenError::Encoding(format!("invalid PHC hash: {}", e)))?;

    match argon2.verify_password(secret.as_bytes(), &parsed) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(TokenError::Encoding(format!("verify error: {}", e))),
    }
}

// Argon2 is CPU-bound; it runs on the blocking pool, not on a runtime worker.
#[async_trait::async_trait]
impl CredentialHasher for Argon2CredentialHasher {
    async fn hash(&self, secret: &str) -> Result<String, TokenError> {
        let argon2 = self.argon2.clone();
        let secret = secret.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&argon2, &secret))
            .await
            .map_err(|e| TokenError::Encoding(format!("hash task failed: {}", e)))?
    }

    async fn verify(&self, secret: &str, hash: &str) -> Result<bool, TokenError> {
        let argon2 = self.argon2.clone();
        let secret = secret.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || verify_blocking(&argon2, &secret, &hash))
            .await
            .map_err(|e| TokenError::Encoding(format!("verify task failed: {}", e)))?
    }
}
