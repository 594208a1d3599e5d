use std::sync::Arc;

use futures::stream;
use tracing::{debug, instrument};

use crate::{
    ByteRange, ChunkPlan, ChunkStreamer, CredentialId, CredentialPool, LoadBalancer,
    ObjectResolver, OpenedObject, RelayConfig, RelayCtx, RelayError, RelayResult, RemoteStore,
    ResolvedObject, SessionCache, StreamContext,
};

/// The relay entry point that HTTP handlers embed.
///
/// Owns the credential pool, the session cache and the streamer; every
/// request goes resolve, plan, select credential, session, stream.
pub struct StreamRelay {
    resolver: Arc<dyn ObjectResolver>,
    pool: Arc<CredentialPool>,
    balancer: LoadBalancer,
    sessions: SessionCache,
    streamer: ChunkStreamer,
    config: RelayConfig,
}

impl StreamRelay {
    /// Create a relay over an already-populated credential pool
    pub fn new<S, R>(store: S, resolver: R, pool: CredentialPool, config: RelayConfig) -> Self
    where
        S: RemoteStore + 'static,
        R: ObjectResolver + 'static,
    {
        Self::from_parts(Arc::new(store), Arc::new(resolver), Arc::new(pool), config)
    }

    /// Create from shared parts
    pub fn from_parts(
        store: Arc<dyn RemoteStore>,
        resolver: Arc<dyn ObjectResolver>,
        pool: Arc<CredentialPool>,
        config: RelayConfig,
    ) -> Self {
        Self {
            resolver,
            balancer: LoadBalancer::new(Arc::clone(&pool)),
            sessions: SessionCache::new(Arc::clone(&store), config.session_timeout),
            streamer: ChunkStreamer::new(store, config.fetch_timeout),
            pool,
            config,
        }
    }

    /// Resolve a handle into a servable object
    #[instrument(skip(self))]
    pub async fn resolve(&self, handle: &str) -> RelayResult<ResolvedObject> {
        let timeout = self.config.resolve_timeout;
        match tokio::time::timeout(timeout, self.resolver.resolve(handle)).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::timeout("object resolution", timeout)),
        }
    }

    /// Plan a range against an object's size with the configured chunk size
    pub fn plan(&self, range: Option<ByteRange>, size: u64) -> RelayResult<ChunkPlan> {
        ChunkPlan::for_range(range, size, self.config.chunk_size)
    }

    /// Resolve a handle and open it for streaming
    pub async fn open(
        &self,
        ctx: RelayCtx,
        handle: &str,
        range: Option<ByteRange>,
    ) -> RelayResult<OpenedObject> {
        let object = self.resolve(handle).await?;
        self.open_resolved(ctx, object, range).await
    }

    /// Open an already resolved object.
    ///
    /// An empty object without a range opens as an empty body and touches no
    /// credential; with a range it is unsatisfiable like any other range.
    #[instrument(skip(self, object), fields(request_id = %ctx.request_id, object_id = object.object_ref.object_id))]
    pub async fn open_resolved(
        &self,
        ctx: RelayCtx,
        object: ResolvedObject,
        range: Option<ByteRange>,
    ) -> RelayResult<OpenedObject> {
        let partial = range.is_some();
        if object.size() == 0 && !partial {
            return Ok(OpenedObject::new(object, None, false, Box::pin(stream::empty())));
        }

        let plan = self.plan(range, object.size())?;
        let credential = self.balancer.select()?;
        let session = self
            .sessions
            .get_or_create(&credential, object.object_ref.partition)
            .await?;

        debug!(
            credential = %credential.id(),
            partition = %object.object_ref.partition,
            start = plan.start,
            end = plan.end,
            chunks = plan.chunk_count,
            "opening stream"
        );

        let context = StreamContext::new(&credential, session, object.object_ref.clone(), plan);
        let body = self.streamer.stream(context);
        Ok(OpenedObject::new(object, Some(plan.resolved_range()), partial, body))
    }

    pub fn pool(&self) -> &Arc<CredentialPool> {
        &self.pool
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Current `(credential, workload)` pairs in ascending id order
    pub fn workloads(&self) -> Vec<(CredentialId, usize)> {
        self.pool.workloads()
    }

    /// Check that the object storage is reachable
    pub async fn probe(&self) -> RelayResult<()> {
        self.resolver.probe().await
    }
}

impl std::fmt::Debug for StreamRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRelay")
            .field("pool", &self.pool)
            .field("sessions", &self.sessions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
