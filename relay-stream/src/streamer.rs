use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use tracing::{debug, warn};

use crate::{
    ByteStream, ChunkPlan, Credential, RelayError, RemoteObjectRef, RemoteStore, Session,
    WorkloadGuard,
};

/// Everything one stream needs, with its unit of credential workload already taken.
///
/// The guard moves into the byte stream, so the workload is released when the
/// stream finishes, fails or is dropped by the consumer.
#[derive(Debug)]
pub struct StreamContext {
    guard: WorkloadGuard,
    session: Session,
    object: RemoteObjectRef,
    plan: ChunkPlan,
}

impl StreamContext {
    pub fn new(
        credential: &Arc<Credential>,
        session: Session,
        object: RemoteObjectRef,
        plan: ChunkPlan,
    ) -> Self {
        Self {
            guard: credential.acquire(),
            session,
            object,
            plan,
        }
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn credential(&self) -> &Arc<Credential> {
        self.guard.credential()
    }
}

/// Drives chunk-aligned fetches and emits only the requested bytes
#[derive(Clone)]
pub struct ChunkStreamer {
    store: Arc<dyn RemoteStore>,
    fetch_timeout: Duration,
}

impl ChunkStreamer {
    pub fn new(store: Arc<dyn RemoteStore>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
        }
    }

    /// Lazily fetch and trim every chunk of the plan.
    ///
    /// Nothing is fetched until the stream is polled and chunk `i + 1` is not
    /// requested before chunk `i` has been taken. A short or empty read ends the
    /// stream after whatever it carried. A failed or timed out fetch yields one
    /// error and ends the stream.
    pub fn stream(&self, ctx: StreamContext) -> ByteStream {
        let store = Arc::clone(&self.store);
        let fetch_timeout = self.fetch_timeout;

        Box::pin(stream! {
            let StreamContext { guard, session, object, plan } = ctx;
            let credential = guard.credential().id();

            for index in 0..plan.chunk_count {
                let offset = plan.chunk_offset(index);
                let fetch = store.fetch_chunk(&session, &object, offset, plan.chunk_size);

                let chunk = match tokio::time::timeout(fetch_timeout, fetch).await {
                    Ok(Ok(chunk)) => chunk,
                    Ok(Err(e)) => {
                        warn!(credential = %credential, offset, error = %e, "chunk fetch failed, aborting stream");
                        yield Err(std::io::Error::other(RelayError::fetch_failed(offset, e)));
                        break;
                    }
                    Err(_) => {
                        warn!(credential = %credential, offset, timeout = ?fetch_timeout, "chunk fetch timed out, aborting stream");
                        yield Err(std::io::Error::other(RelayError::timeout("chunk fetch", fetch_timeout)));
                        break;
                    }
                };

                if chunk.is_empty() {
                    debug!(credential = %credential, offset, "remote object exhausted");
                    break;
                }

                let short = (chunk.len() as u64) < plan.chunk_size;
                let trimmed = plan.trim(index, chunk);
                if !trimmed.is_empty() {
                    yield Ok(trimmed);
                }
                if short {
                    break;
                }
            }

            drop(guard);
        })
    }
}

impl std::fmt::Debug for ChunkStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStreamer")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
