use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use relay_axum::RelayApp;
use relay_stream::{CredentialPool, ObjectResolver, RelayResult, RemoteStore, StreamRelay};
use tracing::{info, warn};

use crate::local_store::{LocalStore, INDEX_FILE};
use crate::ServerConfig;

/// Open the store, verify it, start credentials and wire the HTTP app.
pub async fn build(config: &ServerConfig) -> Result<RelayApp> {
    let store = open_store(&config.store_root, config.verify_retries, config.verify_delay)
        .await
        .map_err(|e| {
            anyhow!(
                "Failed to open store at {}: {e}. Check STORE_ROOT and its {INDEX_FILE}",
                config.store_root.display()
            )
        })?;
    let store = Arc::new(store);

    let resolver: Arc<dyn ObjectResolver> = store.clone();
    let remote: Arc<dyn RemoteStore> = store;
    let pool = CredentialPool::bootstrap(Arc::clone(&remote), config.credentials.clone()).await;
    if pool.is_empty() {
        warn!("no credential started; downloads will fail until one is registered");
    }

    let relay = StreamRelay::from_parts(remote, resolver, Arc::new(pool), config.relay.clone());
    info!(
        credentials = relay.pool().len(),
        workloads = ?relay.workloads(),
        sessions = relay.sessions().len(),
        chunk_size = relay.config().chunk_size,
        "relay ready"
    );

    Ok(RelayApp::new(relay).with_default_layers())
}

/// Load and probe the store under `root`, retrying while the root or its
/// index is not there yet.
pub async fn open_store(root: &Path, retries: u32, delay: Duration) -> RelayResult<LocalStore> {
    with_retries(retries, delay, || async move {
        let store = LocalStore::open(root).await?;
        store.probe().await?;
        Ok(store)
    })
    .await
}

/// Probe storage up to `retries` times, `delay` apart.
pub async fn verify_storage(
    resolver: &dyn ObjectResolver,
    retries: u32,
    delay: Duration,
) -> Result<()> {
    with_retries(retries, delay, || resolver.probe()).await?;
    Ok(())
}

async fn with_retries<T, F, Fut>(retries: u32, delay: Duration, mut attempt: F) -> RelayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RelayResult<T>>,
{
    let retries = retries.max(1);
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(value) => {
                info!(attempt = tries, "object storage verified");
                return Ok(value);
            }
            Err(e) if tries < retries => {
                warn!(attempt = tries, retries, error = %e, "object storage not reachable, retrying");
                tokio::time::sleep(delay).await;
                tries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
