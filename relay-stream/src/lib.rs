//! # relay-stream: range-aware streaming over a chunked remote object store
//!
//! `relay-stream` turns an opaque object handle plus an optional byte range
//! into a lazy byte stream, fetching from a remote store that only serves
//! fixed-size, chunk-aligned reads and spreading load across several backend
//! credentials.
//!
//! ## Key Features
//!
//! - **Exact ranges**: chunk-aligned fetches are trimmed so the body is exactly the requested bytes
//! - **Least-loaded credentials**: each stream runs under the credential with the fewest live streams
//! - **Session reuse**: one authorized session per (credential, partition), established on first use
//! - **Scoped workload**: a stream holds its credential's workload until it ends, fails or is dropped
//! - **Transport agnostic**: no HTTP types; the HTTP layer lives in `relay-axum`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use relay_stream::prelude::*;
//!
//! let pool = CredentialPool::bootstrap(store.clone(), specs).await;
//! let relay = StreamRelay::from_parts(store, resolver, Arc::new(pool), RelayConfig::default());
//!
//! let opened = relay
//!     .open(RelayCtx::new(), &handle, Some(ByteRange::new(0, Some(1023))))
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP handler  │  ← status codes and headers
//! ├─────────────────┤
//! │   StreamRelay   │  ← resolve, plan, balance, session, stream
//! ├─────────────────┤
//! │   RemoteStore   │  ← sessions and chunk fetches
//! └─────────────────┘
//! ```

pub mod adapter;
mod balancer;
mod config;
mod error;
mod opened;
mod plan;
mod pool;
mod session;
pub mod store;
mod streamer;
mod types;

pub use adapter::StreamRelay;
pub use balancer::LoadBalancer;
pub use config::{RelayConfig, DEFAULT_CHUNK_SIZE};
pub use error::{RelayError, RelayResult};
pub use opened::OpenedObject;
pub use plan::{ChunkPlan, ResolvedRange};
pub use pool::{Credential, CredentialPool, WorkloadGuard};
pub use session::SessionCache;
pub use store::{AuthToken, CredentialSpec, ObjectResolver, RemoteStore, Session, SessionKey};
pub use streamer::{ChunkStreamer, StreamContext};
pub use types::{
    ByteRange, ByteStream, CredentialId, MediaInfo, MediaPayload, PartitionId, RelayCtx,
    RemoteObjectRef, ResolvedObject,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ByteRange, ByteStream, CredentialPool, CredentialSpec, ObjectResolver, OpenedObject,
        RelayConfig, RelayCtx, RelayError, RelayResult, RemoteStore, StreamRelay,
    };
}
