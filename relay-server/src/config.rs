use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use relay_core::ConfigStore;
use relay_stream::{CredentialId, CredentialSpec, RelayConfig};

const RELAY_ENV_PREFIX: &str = "RELAY__";
const MULTI_TOKEN_PREFIX: &str = "MULTI_TOKEN";

/// Everything the binary reads from its environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store_root: PathBuf,
    /// Primary credential first (id 0), then auxiliary ones in env-key order
    pub credentials: Vec<CredentialSpec>,
    pub verify_retries: u32,
    pub verify_delay: Duration,
    pub relay: RelayConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build from `(key, value)` pairs.
    ///
    /// `RELAY__CHUNK_SIZE` style variables land on the `relay.*` keys read by
    /// [`RelayConfig::from_snapshot`].
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let var = |key: &str| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = var("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("HTTP_PORT").or_else(|| var("PORT")) {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT: {port}"))?,
            None => 8000,
        };
        let store_root = PathBuf::from(var("STORE_ROOT").unwrap_or_else(|| "./store".to_string()));

        let primary = var("PRIMARY_TOKEN")
            .or_else(|| var("BOT_TOKEN"))
            .ok_or_else(|| anyhow!("Missing PRIMARY_TOKEN"))?;

        let mut auxiliary: Vec<&(String, String)> = vars
            .iter()
            .filter(|(k, v)| k.starts_with(MULTI_TOKEN_PREFIX) && !v.trim().is_empty())
            .collect();
        auxiliary.sort_by(|a, b| a.0.cmp(&b.0));

        let mut credentials = vec![CredentialSpec::new(CredentialId(0), primary)];
        credentials.extend(
            auxiliary
                .into_iter()
                .zip(1u32..)
                .map(|((_, token), id)| CredentialSpec::new(CredentialId(id), token.trim())),
        );

        let verify_retries = match var("STORAGE_VERIFY_RETRIES") {
            Some(n) => n
                .parse::<u32>()
                .map_err(|_| anyhow!("Invalid STORAGE_VERIFY_RETRIES: {n}"))?
                .max(1),
            None => 5,
        };
        let verify_delay = match var("STORAGE_VERIFY_DELAY_SECS") {
            Some(n) => Duration::from_secs(
                n.parse()
                    .map_err(|_| anyhow!("Invalid STORAGE_VERIFY_DELAY_SECS: {n}"))?,
            ),
            None => Duration::from_secs(5),
        };

        let mut store = ConfigStore::new();
        store.load_vars(
            "",
            vars.iter()
                .filter(|(k, _)| k.starts_with(RELAY_ENV_PREFIX))
                .cloned(),
        );
        let relay = RelayConfig::from_snapshot(&store.snapshot());

        Ok(Self {
            host,
            port,
            store_root,
            credentials,
            verify_retries,
            verify_delay,
            relay,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
