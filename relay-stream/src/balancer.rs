use std::sync::Arc;

use crate::{Credential, CredentialId, CredentialPool, RelayError, RelayResult};

/// Picks the credential a new stream should run under.
///
/// Reads a live workload snapshot; the caller increments the chosen
/// credential when streaming begins, so two concurrent selections may see
/// the same snapshot. Balance is approximate by design of the counters.
#[derive(Debug, Clone)]
pub struct LoadBalancer {
    pool: Arc<CredentialPool>,
}

impl LoadBalancer {
    pub fn new(pool: Arc<CredentialPool>) -> Self {
        Self { pool }
    }

    /// Least-loaded credential; ties go to the smallest id.
    pub fn select(&self) -> RelayResult<Arc<Credential>> {
        self.pool
            .with_credentials(|credentials| {
                // BTreeMap iterates in id order and min_by_key keeps the first minimum
                credentials
                    .values()
                    .min_by_key(|c| c.workload())
                    .cloned()
            })
            .ok_or(RelayError::NoBackendAvailable)
    }

    pub fn select_id(&self) -> RelayResult<CredentialId> {
        self.select().map(|c| c.id())
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }
}
