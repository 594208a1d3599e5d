#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use relay_axum::RelayApp;
use relay_stream::{
    AuthToken, Credential, CredentialId, CredentialPool, CredentialSpec, MediaInfo, MediaPayload,
    ObjectResolver, PartitionId, RelayConfig, RelayError, RelayResult, RemoteObjectRef,
    RemoteStore, ResolvedObject, Session, StreamRelay,
};

pub const HOME: PartitionId = PartitionId(1);

/// Remote store over in-memory objects; every session is authorized
#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<u64, Bytes>,
    fail_at: Option<u64>,
}

impl MemoryStore {
    pub fn with_object(mut self, object_id: u64, data: Bytes) -> Self {
        self.objects.insert(object_id, data);
        self
    }

    /// Make the fetch at `offset` fail
    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_at = Some(offset);
        self
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn authenticate(&self, _credential: &CredentialSpec) -> RelayResult<PartitionId> {
        Ok(HOME)
    }

    async fn primary_session(&self, credential: CredentialId) -> RelayResult<Session> {
        Ok(Session::new(credential, HOME, ()))
    }

    async fn open_session(
        &self,
        credential: CredentialId,
        partition: PartitionId,
    ) -> RelayResult<Session> {
        Ok(Session::new(credential, partition, ()))
    }

    async fn export_authorization(
        &self,
        _session: &Session,
        target: PartitionId,
    ) -> RelayResult<AuthToken> {
        Ok(AuthToken {
            id: i64::from(target.0),
            bytes: Bytes::new(),
        })
    }

    async fn import_authorization(&self, _session: &Session, _token: AuthToken) -> RelayResult<()> {
        Ok(())
    }

    async fn fetch_chunk(
        &self,
        _session: &Session,
        object: &RemoteObjectRef,
        offset: u64,
        length: u64,
    ) -> RelayResult<Bytes> {
        if self.fail_at == Some(offset) {
            return Err(RelayError::backend_msg("connection reset"));
        }
        let data = self
            .objects
            .get(&object.object_id)
            .ok_or_else(|| RelayError::not_found(object.object_id.to_string()))?;
        let len = data.len() as u64;
        let start = offset.min(len) as usize;
        let end = offset.saturating_add(length).min(len) as usize;
        Ok(data.slice(start..end))
    }
}

#[derive(Default)]
pub struct TableResolver {
    objects: HashMap<String, ResolvedObject>,
}

impl TableResolver {
    pub fn with(mut self, handle: &str, object: ResolvedObject) -> Self {
        self.objects.insert(handle.to_string(), object);
        self
    }
}

#[async_trait]
impl ObjectResolver for TableResolver {
    async fn resolve(&self, handle: &str) -> RelayResult<ResolvedObject> {
        self.objects
            .get(handle)
            .cloned()
            .ok_or_else(|| RelayError::not_found(handle))
    }
}

pub fn object_bytes(size: u64) -> Bytes {
    (0..size).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}

pub fn document(object_id: u64, size: u64, file_name: &str, mime: Option<&str>) -> ResolvedObject {
    let mut info = MediaInfo::new(size).with_file_name(file_name);
    info.mime_type = mime.map(str::to_string);
    ResolvedObject::new(
        RemoteObjectRef::new(HOME, object_id, 7),
        MediaPayload::Document(info),
    )
}

pub fn relay(store: MemoryStore, resolver: TableResolver, credentials: &[u32]) -> Arc<StreamRelay> {
    let pool = CredentialPool::from_credentials(
        credentials
            .iter()
            .map(|id| Credential::new(CredentialId(*id), HOME)),
    );
    Arc::new(StreamRelay::new(store, resolver, pool, RelayConfig::default()))
}

pub fn router(relay: &Arc<StreamRelay>) -> Router {
    RelayApp::from_shared(Arc::clone(relay))
        .with_default_layers()
        .router
}
