#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use relay_stream::{
    AuthToken, CredentialId, CredentialSpec, MediaInfo, MediaPayload, ObjectResolver, PartitionId,
    RelayError, RelayResult, RemoteObjectRef, RemoteStore, ResolvedObject, Session,
};

pub const HOME: PartitionId = PartitionId(1);

/// Connection state the mock hands out inside a `Session`
#[derive(Debug)]
pub struct MockConnection {
    pub authorized: AtomicBool,
}

/// In-memory remote store that counts every call and can be told to misbehave
#[derive(Default)]
pub struct MockRemoteStore {
    objects: Mutex<HashMap<u64, Bytes>>,
    homes: Mutex<HashMap<CredentialId, PartitionId>>,
    primaries: Mutex<HashMap<CredentialId, Session>>,

    pub authenticate_calls: AtomicUsize,
    pub primary_calls: AtomicUsize,
    pub open_calls: AtomicUsize,
    pub export_calls: AtomicUsize,
    pub import_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub fetch_offsets: Mutex<Vec<u64>>,

    /// Number of upcoming exports that fail
    pub failing_exports: AtomicUsize,
    pub session_delay: Mutex<Option<Duration>>,
    pub fetch_delay: Mutex<Option<Duration>>,
    pub fail_fetch_at: Mutex<Option<u64>>,
    /// Serve at most this many bytes of every object
    pub truncate_at: Mutex<Option<u64>>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, object_id: u64, data: Bytes) -> Self {
        self.objects.lock().insert(object_id, data);
        self
    }

    pub fn with_home(self, credential: CredentialId, partition: PartitionId) -> Self {
        self.homes.lock().insert(credential, partition);
        self
    }

    pub fn home_of(&self, credential: CredentialId) -> PartitionId {
        self.homes.lock().get(&credential).copied().unwrap_or(HOME)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    async fn session_pause(&self) {
        let delay = *self.session_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn authenticate(&self, credential: &CredentialSpec) -> RelayResult<PartitionId> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        if credential.secret.is_empty() || credential.secret == "bad" {
            return Err(RelayError::backend_msg("invalid credential"));
        }
        Ok(self.home_of(credential.id))
    }

    async fn primary_session(&self, credential: CredentialId) -> RelayResult<Session> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        self.session_pause().await;
        let home = self.home_of(credential);
        let session = self
            .primaries
            .lock()
            .entry(credential)
            .or_insert_with(|| {
                Session::new(
                    credential,
                    home,
                    MockConnection {
                        authorized: AtomicBool::new(true),
                    },
                )
            })
            .clone();
        Ok(session)
    }

    async fn open_session(
        &self,
        credential: CredentialId,
        partition: PartitionId,
    ) -> RelayResult<Session> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.session_pause().await;
        Ok(Session::new(
            credential,
            partition,
            MockConnection {
                authorized: AtomicBool::new(false),
            },
        ))
    }

    async fn export_authorization(
        &self,
        session: &Session,
        target: PartitionId,
    ) -> RelayResult<AuthToken> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_exports
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RelayError::backend_msg("export rejected"));
        }
        Ok(AuthToken {
            id: i64::from(target.0),
            bytes: Bytes::from(format!("{}->{}", session.partition(), target)),
        })
    }

    async fn import_authorization(&self, session: &Session, token: AuthToken) -> RelayResult<()> {
        self.import_calls.fetch_add(1, Ordering::SeqCst);
        if token.id != i64::from(session.partition().0) {
            return Err(RelayError::backend_msg("token for another partition"));
        }
        if let Some(connection) = session.downcast_ref::<MockConnection>() {
            connection.authorized.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn fetch_chunk(
        &self,
        session: &Session,
        object: &RemoteObjectRef,
        offset: u64,
        length: u64,
    ) -> RelayResult<Bytes> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_offsets.lock().push(offset);

        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_fetch_at.lock() == Some(offset) {
            return Err(RelayError::backend_msg("connection reset"));
        }

        let authorized = session
            .downcast_ref::<MockConnection>()
            .map(|c| c.authorized.load(Ordering::SeqCst))
            .unwrap_or(false);
        if !authorized || session.partition() != object.partition {
            return Err(RelayError::backend_msg("session not authorized for partition"));
        }

        let data = self
            .objects
            .lock()
            .get(&object.object_id)
            .cloned()
            .ok_or_else(|| RelayError::not_found(object.object_id.to_string()))?;
        let truncate = *self.truncate_at.lock();
        let limit = truncate
            .map(|t| t.min(data.len() as u64))
            .unwrap_or(data.len() as u64);

        let start = offset.min(limit) as usize;
        let end = offset.saturating_add(length).min(limit) as usize;
        Ok(data.slice(start..end))
    }
}

/// Resolver over a fixed handle table
#[derive(Default)]
pub struct MockResolver {
    objects: HashMap<String, ResolvedObject>,
    pub probe_failures: AtomicUsize,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handle: &str, object: ResolvedObject) -> Self {
        self.objects.insert(handle.to_string(), object);
        self
    }
}

#[async_trait]
impl ObjectResolver for MockResolver {
    async fn resolve(&self, handle: &str) -> RelayResult<ResolvedObject> {
        self.objects
            .get(handle)
            .cloned()
            .ok_or_else(|| RelayError::not_found(handle))
    }

    async fn probe(&self) -> RelayResult<()> {
        let failing = self
            .probe_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(RelayError::backend_msg("storage unreachable"))
        } else {
            Ok(())
        }
    }
}

/// Deterministic object body
pub fn object_bytes(size: u64) -> Bytes {
    (0..size).map(|i| (i % 253) as u8).collect::<Vec<u8>>().into()
}

pub fn video(partition: PartitionId, object_id: u64, size: u64) -> ResolvedObject {
    ResolvedObject::new(
        RemoteObjectRef::new(partition, object_id, 42),
        MediaPayload::Video(
            MediaInfo::new(size)
                .with_file_name("clip.mp4")
                .with_mime_type("video/mp4"),
        ),
    )
}

pub fn specs(ids: &[u32]) -> Vec<CredentialSpec> {
    ids.iter()
        .map(|id| CredentialSpec::new(CredentialId(*id), format!("secret-{id}")))
        .collect()
}
