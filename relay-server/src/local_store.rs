//! Directory-backed stand-in for the chat-platform store.
//!
//! `STORE_ROOT/index.json` maps handles to stored files:
//!
//! ```text
//! {
//!   "intro": {
//!     "partition": 2, "object_id": 17, "access_hash": 99,
//!     "kind": "video", "file_name": "intro.mp4", "mime_type": "video/mp4",
//!     "path": "media/intro.mp4"
//!   }
//! }
//! ```
//!
//! Sessions carry a partition and an authorized flag, so the relay's
//! cross-partition handoff is exercised exactly as against the real store.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use relay_stream::{
    AuthToken, CredentialId, CredentialSpec, MediaInfo, MediaPayload, ObjectResolver, PartitionId,
    RelayError, RelayResult, RemoteObjectRef, RemoteStore, ResolvedObject, Session,
};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

pub const INDEX_FILE: &str = "index.json";

/// Every credential signs in to this partition
pub const HOME_PARTITION: PartitionId = PartitionId(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Document,
    Video,
    Audio,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexEntry {
    pub partition: u32,
    pub object_id: u64,
    #[serde(default)]
    pub access_hash: u64,
    #[serde(default = "default_kind")]
    pub kind: MediaKind,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub path: PathBuf,
}

fn default_kind() -> MediaKind {
    MediaKind::Document
}

impl IndexEntry {
    fn object_ref(&self) -> RemoteObjectRef {
        RemoteObjectRef::new(PartitionId(self.partition), self.object_id, self.access_hash)
    }

    fn media(&self, size: u64) -> MediaPayload {
        let mut info = MediaInfo::new(size);
        info.file_name = self.file_name.clone();
        info.mime_type = self.mime_type.clone();
        match self.kind {
            MediaKind::Document => MediaPayload::Document(info),
            MediaKind::Video => MediaPayload::Video(info),
            MediaKind::Audio => MediaPayload::Audio(info),
        }
    }
}

#[derive(Debug)]
struct LocalSession {
    authorized: AtomicBool,
}

impl LocalSession {
    fn new(authorized: bool) -> Self {
        Self {
            authorized: AtomicBool::new(authorized),
        }
    }
}

fn is_authorized(session: &Session) -> bool {
    session
        .downcast_ref::<LocalSession>()
        .map(|s| s.authorized.load(Ordering::Acquire))
        .unwrap_or(false)
}

/// Files under a root directory, served through the relay's store traits
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
    index: HashMap<String, IndexEntry>,
}

impl LocalStore {
    /// Load `root/index.json`
    pub async fn open(root: impl AsRef<Path>) -> RelayResult<Self> {
        let root = root.as_ref().to_path_buf();
        let raw = tokio::fs::read(root.join(INDEX_FILE)).await?;
        let index: HashMap<String, IndexEntry> = serde_json::from_slice(&raw)
            .map_err(|e| RelayError::invalid(format!("{INDEX_FILE}: {e}")))?;
        debug!(root = %root.display(), objects = index.len(), "local store opened");
        Ok(Self { root, index })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look a handle up by index key, then as an encoded object reference
    fn entry_for(&self, handle: &str) -> RelayResult<&IndexEntry> {
        if let Some(entry) = self.index.get(handle) {
            return Ok(entry);
        }
        let wanted = RemoteObjectRef::decode(handle)?;
        self.index
            .values()
            .find(|e| {
                e.partition == wanted.partition.0
                    && e.object_id == wanted.object_id
                    && e.access_hash == wanted.access_hash
            })
            .ok_or_else(|| RelayError::not_found(handle))
    }

    fn entry_for_object(&self, object: &RemoteObjectRef) -> RelayResult<&IndexEntry> {
        self.index
            .values()
            .find(|e| e.partition == object.partition.0 && e.object_id == object.object_id)
            .ok_or_else(|| RelayError::not_found(object.object_id.to_string()))
    }
}

#[async_trait]
impl ObjectResolver for LocalStore {
    async fn resolve(&self, handle: &str) -> RelayResult<ResolvedObject> {
        let entry = self.entry_for(handle)?;
        let metadata = tokio::fs::metadata(self.root.join(&entry.path))
            .await
            .map_err(|_| RelayError::not_found(handle))?;
        Ok(ResolvedObject::new(entry.object_ref(), entry.media(metadata.len())))
    }

    async fn probe(&self) -> RelayResult<()> {
        let metadata = tokio::fs::metadata(&self.root).await?;
        if !metadata.is_dir() {
            return Err(RelayError::invalid(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn authenticate(&self, credential: &CredentialSpec) -> RelayResult<PartitionId> {
        if credential.secret.trim().is_empty() {
            return Err(RelayError::backend_msg("empty credential secret"));
        }
        Ok(HOME_PARTITION)
    }

    async fn primary_session(&self, credential: CredentialId) -> RelayResult<Session> {
        Ok(Session::new(credential, HOME_PARTITION, LocalSession::new(true)))
    }

    async fn open_session(
        &self,
        credential: CredentialId,
        partition: PartitionId,
    ) -> RelayResult<Session> {
        Ok(Session::new(credential, partition, LocalSession::new(false)))
    }

    async fn export_authorization(
        &self,
        session: &Session,
        target: PartitionId,
    ) -> RelayResult<AuthToken> {
        if !is_authorized(session) {
            return Err(RelayError::backend_msg("export from an unauthorized session"));
        }
        Ok(AuthToken {
            id: i64::from(target.0),
            bytes: Bytes::from(format!("{}:{}", session.credential(), target)),
        })
    }

    async fn import_authorization(&self, session: &Session, token: AuthToken) -> RelayResult<()> {
        if token.id != i64::from(session.partition().0) {
            return Err(RelayError::backend_msg(format!(
                "authorization for partition {} imported into partition {}",
                token.id,
                session.partition()
            )));
        }
        if let Some(local) = session.downcast_ref::<LocalSession>() {
            local.authorized.store(true, Ordering::Release);
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
        if !is_authorized(session) || session.partition() != object.partition {
            return Err(RelayError::backend_msg(format!(
                "session is not authorized for partition {}",
                object.partition
            )));
        }
        let entry = self.entry_for_object(object)?;
        if entry.access_hash != object.access_hash {
            return Err(RelayError::backend_msg("access hash mismatch"));
        }

        let mut file = tokio::fs::File::open(self.root.join(&entry.path)).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = BytesMut::with_capacity(length as usize);
        let mut reader = file.take(length);
        while reader.read_buf(&mut buf).await? > 0 {}
        Ok(buf.freeze())
    }
}
