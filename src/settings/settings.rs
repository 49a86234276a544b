use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub hasher: Hasher,
    pub http: Http,
    pub log: Log,
    pub store: Store,
    pub token: Token,
}

#[derive(Debug, Deserialize)]
pub struct Hasher {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Store {
    pub backend: String, // "memory", "redis" or "mysql"
    pub redis_dsn: Option<String>,
    pub mysql_dsn: Option<String>,
    pub key_prefix: String,
    pub timeout_ms: u64,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |dsn: &Option<String>| dsn.as_ref().map(|_| "<redacted>");
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("redis_dsn", &redact(&self.redis_dsn))
            .field("mysql_dsn", &redact(&self.mysql_dsn))
            .field("key_prefix", &self.key_prefix)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct Token {
    pub access_key: String,
    pub refresh_key: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_key", &"<redacted>")
            .field("refresh_key", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl Token {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

impl Store {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Http {
    /// Both paths must be present to serve TLS.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => Some((cert.as_str(), key.as_str())),
            _ => None,
        }
    }
}

/// Ten years.
pub const MAX_TTL_SECS: u64 = 10 * 366 * 24 * 60 * 60;

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let token = &self.token;
        if token.access_key.is_empty() || token.refresh_key.is_empty() {
            bail!("token signing keys must not be empty");
        }
        if token.access_key == token.refresh_key {
            bail!("access and refresh signing keys must differ");
        }
        if token.access_ttl_secs == 0 || token.refresh_ttl_secs == 0 {
            bail!("token TTLs must be positive");
        }
        if token.access_ttl_secs > MAX_TTL_SECS || token.refresh_ttl_secs > MAX_TTL_SECS {
            bail!("token TTLs must not exceed {} seconds", MAX_TTL_SECS);
        }
        if self.store.timeout_ms == 0 {
            bail!("store timeout must be positive");
        }
        match self.store.backend.as_str() {
            "memory" => {}
            "redis" if self.store.redis_dsn.is_some() => {}
            "mysql" if self.store.mysql_dsn.is_some() => {}
            "redis" | "mysql" => bail!("store backend {} requires a dsn", self.store.backend),
            other => bail!("unknown store backend: {}", other),
        }
        if self.http.cert_path.is_some() != self.http.key_path.is_some() {
            bail!("http cert_path and key_path must be set together");
        }
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

const ENV_PREFIX: &str = "TOKENPAIR";

/// Loads the TOML file, then applies `TOKENPAIR__<SECTION>__<KEY>` overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}
