use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{CredentialId, PartitionId, RelayResult, RemoteObjectRef, ResolvedObject};

/// Remote store operations the relay drives - implemented by the chat-platform client
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Sign a credential in and report its home partition
    async fn authenticate(&self, credential: &CredentialSpec) -> RelayResult<PartitionId>;

    /// The session the credential signed in with, bound to its home partition
    async fn primary_session(&self, credential: CredentialId) -> RelayResult<Session>;

    /// Open a fresh, not yet authorized session against a partition
    async fn open_session(
        &self,
        credential: CredentialId,
        partition: PartitionId,
    ) -> RelayResult<Session>;

    /// Export an authorization scoped to `target` from an authorized session
    async fn export_authorization(
        &self,
        session: &Session,
        target: PartitionId,
    ) -> RelayResult<AuthToken>;

    /// Import a previously exported authorization into a session
    async fn import_authorization(&self, session: &Session, token: AuthToken) -> RelayResult<()>;

    /// Fetch up to `length` bytes at `offset`.
    ///
    /// May return fewer bytes (or none) once the end of the object is reached.
    async fn fetch_chunk(
        &self,
        session: &Session,
        object: &RemoteObjectRef,
        offset: u64,
        length: u64,
    ) -> RelayResult<Bytes>;
}

/// Turns an external handle into a servable object
#[async_trait]
pub trait ObjectResolver: Send + Sync {
    /// Resolve a handle; unknown or undecodable handles fail with `ObjectNotFound`
    async fn resolve(&self, handle: &str) -> RelayResult<ResolvedObject>;

    /// Check that the backing storage is reachable
    async fn probe(&self) -> RelayResult<()> {
        Ok(())
    }
}

/// Key of a cached session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub credential: CredentialId,
    pub partition: PartitionId,
}

impl SessionKey {
    pub fn new(credential: CredentialId, partition: PartitionId) -> Self {
        Self {
            credential,
            partition,
        }
    }
}

/// An established, partition-scoped channel opened under one credential.
///
/// The store-specific connection lives behind `Any`; cloning shares it.
#[derive(Clone)]
pub struct Session {
    key: SessionKey,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Session {
    pub fn new<T>(credential: CredentialId, partition: PartitionId, inner: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            key: SessionKey::new(credential, partition),
            inner: Arc::new(inner),
        }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn credential(&self) -> CredentialId {
        self.key.credential
    }

    pub fn partition(&self) -> PartitionId {
        self.key.partition
    }

    /// Borrow the store-specific connection
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Whether both handles share the same underlying connection
    pub fn same_as(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credential", &self.key.credential)
            .field("partition", &self.key.partition)
            .finish_non_exhaustive()
    }
}

/// Authorization exported from one partition for import into another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub id: i64,
    pub bytes: Bytes,
}

/// A backend identity as handed over by the credential source
#[derive(Clone)]
pub struct CredentialSpec {
    pub id: CredentialId,
    pub secret: String,
}

impl CredentialSpec {
    pub fn new<S: Into<String>>(id: CredentialId, secret: S) -> Self {
        Self {
            id,
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSpec")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
