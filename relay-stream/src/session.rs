use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{Credential, PartitionId, RelayError, RelayResult, RemoteStore, Session, SessionKey};

/// Per (credential, partition) cache of established sessions.
///
/// Each key owns a `OnceCell`, so concurrent callers for an uncached key wait
/// on one establishment instead of racing their own. A failed establishment
/// leaves the cell empty and the next caller tries again.
pub struct SessionCache {
    store: Arc<dyn RemoteStore>,
    slots: DashMap<SessionKey, Arc<OnceCell<Session>>>,
    timeout: Duration,
}

impl SessionCache {
    pub fn new(store: Arc<dyn RemoteStore>, timeout: Duration) -> Self {
        Self {
            store,
            slots: DashMap::new(),
            timeout,
        }
    }

    /// Return the cached session for the key, establishing it on first use.
    pub async fn get_or_create(
        &self,
        credential: &Credential,
        partition: PartitionId,
    ) -> RelayResult<Session> {
        let key = SessionKey::new(credential.id(), partition);
        let slot = Arc::clone(&self.slots.entry(key).or_default());

        slot.get_or_try_init(|| self.establish(credential, partition))
            .await
            .cloned()
    }

    /// Cached session for the key, if one is established
    pub fn get(&self, key: SessionKey) -> Option<Session> {
        self.slots.get(&key).and_then(|slot| slot.get().cloned())
    }

    /// Number of established sessions
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn establish(
        &self,
        credential: &Credential,
        partition: PartitionId,
    ) -> RelayResult<Session> {
        let id = credential.id();
        let handoff = async {
            if partition == credential.home_partition() {
                debug!(credential = %id, partition = %partition, "binding primary session");
                return self.store.primary_session(id).await;
            }

            let home = self.store.primary_session(id).await?;
            let token = self.store.export_authorization(&home, partition).await?;
            let session = self.store.open_session(id, partition).await?;
            self.store.import_authorization(&session, token).await?;
            Ok(session)
        };

        match tokio::time::timeout(self.timeout, handoff).await {
            Ok(Ok(session)) => {
                info!(credential = %id, partition = %partition, "session established");
                Ok(session)
            }
            Ok(Err(e)) => {
                warn!(credential = %id, partition = %partition, error = %e, "session establishment failed");
                Err(RelayError::session_failed(id, partition, e))
            }
            Err(_) => {
                warn!(credential = %id, partition = %partition, timeout = ?self.timeout, "session establishment timed out");
                Err(RelayError::session_failed(
                    id,
                    partition,
                    RelayError::timeout("session establishment", self.timeout),
                ))
            }
        }
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("sessions", &self.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
