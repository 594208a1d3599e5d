use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{error, info};

use crate::{CredentialId, CredentialSpec, PartitionId, RemoteStore};

/// One backend identity and its live count of in-flight streams
#[derive(Debug)]
pub struct Credential {
    id: CredentialId,
    home_partition: PartitionId,
    workload: AtomicUsize,
}

impl Credential {
    pub fn new(id: CredentialId, home_partition: PartitionId) -> Self {
        Self {
            id,
            home_partition,
            workload: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> CredentialId {
        self.id
    }

    pub fn home_partition(&self) -> PartitionId {
        self.home_partition
    }

    /// Current number of streams running under this credential
    pub fn workload(&self) -> usize {
        self.workload.load(Ordering::Acquire)
    }

    /// Take one unit of streaming capacity, released when the guard drops
    pub fn acquire(self: &Arc<Self>) -> WorkloadGuard {
        self.workload.fetch_add(1, Ordering::AcqRel);
        WorkloadGuard {
            credential: Arc::clone(self),
        }
    }
}

/// Scoped unit of streaming capacity on a credential.
///
/// Decrements the workload exactly once, on whatever path drops it.
#[derive(Debug)]
pub struct WorkloadGuard {
    credential: Arc<Credential>,
}

impl WorkloadGuard {
    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }
}

impl Drop for WorkloadGuard {
    fn drop(&mut self) {
        self.credential.workload.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The set of credentials the relay may stream through.
///
/// Membership changes rarely (startup, auxiliary registration) and sits behind
/// a read-mostly lock; workloads are per-credential atomics.
#[derive(Debug, Default)]
pub struct CredentialPool {
    credentials: RwLock<BTreeMap<CredentialId, Arc<Credential>>>,
}

impl CredentialPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_credentials<I>(credentials: I) -> Self
    where
        I: IntoIterator<Item = Credential>,
    {
        let map = credentials
            .into_iter()
            .map(|c| (c.id, Arc::new(c)))
            .collect();
        Self {
            credentials: RwLock::new(map),
        }
    }

    /// Sign every credential in concurrently and keep the ones that come up.
    pub async fn bootstrap(store: Arc<dyn RemoteStore>, specs: Vec<CredentialSpec>) -> Self {
        let attempts = specs.into_iter().map(|spec| {
            let store = Arc::clone(&store);
            async move {
                match store.authenticate(&spec).await {
                    Ok(home) => {
                        info!(credential = %spec.id, partition = %home, "credential started");
                        Some(Credential::new(spec.id, home))
                    }
                    Err(e) => {
                        error!(credential = %spec.id, error = %e, "failed to start credential, skipping");
                        None
                    }
                }
            }
        });

        let started = join_all(attempts).await.into_iter().flatten();
        let pool = Self::from_credentials(started);
        if pool.len() > 1 {
            info!(credentials = pool.len(), "multi-credential mode enabled");
        }
        pool
    }

    /// Add a credential, or return the existing one with the same id.
    pub fn register(&self, credential: Credential) -> Arc<Credential> {
        let mut map = self.credentials.write();
        Arc::clone(
            map.entry(credential.id)
                .or_insert_with(|| Arc::new(credential)),
        )
    }

    pub fn get(&self, id: CredentialId) -> Option<Arc<Credential>> {
        self.credentials.read().get(&id).cloned()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> Vec<CredentialId> {
        self.credentials.read().keys().copied().collect()
    }

    /// Credentials in ascending id order
    pub fn credentials(&self) -> Vec<Arc<Credential>> {
        self.credentials.read().values().cloned().collect()
    }

    /// `(id, workload)` pairs in ascending id order
    pub fn workloads(&self) -> Vec<(CredentialId, usize)> {
        self.credentials
            .read()
            .values()
            .map(|c| (c.id, c.workload()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }

    pub(crate) fn with_credentials<R>(
        &self,
        f: impl FnOnce(&BTreeMap<CredentialId, Arc<Credential>>) -> R,
    ) -> R {
        f(&self.credentials.read())
    }
}
