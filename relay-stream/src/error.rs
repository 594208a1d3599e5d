use thiserror::Error;

use crate::{CredentialId, PartitionId};

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while relaying an object
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Object not found: {handle}")]
    ObjectNotFound { handle: String },

    #[error("Range {start}-{end} not satisfiable for object of {size} bytes")]
    RangeNotSatisfiable { start: u64, end: u64, size: u64 },

    #[error("No backend credential available")]
    NoBackendAvailable,

    #[error("Failed to establish session for credential {credential} on partition {partition}: {source}")]
    SessionEstablishmentFailed {
        credential: CredentialId,
        partition: PartitionId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Upstream fetch failed at offset {offset}: {source}")]
    UpstreamFetchFailed {
        offset: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: &'static str, after_ms: u64 },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Remote store error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl RelayError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a backend error from a message
    pub fn backend_msg<S: Into<String>>(message: S) -> Self {
        let message: String = message.into();
        Self::Backend {
            source: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(handle: S) -> Self {
        Self::ObjectNotFound {
            handle: handle.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn range_not_satisfiable(start: u64, end: u64, size: u64) -> Self {
        Self::RangeNotSatisfiable { start, end, size }
    }

    pub fn session_failed(
        credential: CredentialId,
        partition: PartitionId,
        source: RelayError,
    ) -> Self {
        Self::SessionEstablishmentFailed {
            credential,
            partition,
            source: Box::new(source),
        }
    }

    pub fn fetch_failed(offset: u64, source: RelayError) -> Self {
        Self::UpstreamFetchFailed {
            offset,
            source: Box::new(source),
        }
    }

    pub fn timeout(operation: &'static str, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }
    }

    /// Whether a later request may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SessionEstablishmentFailed { .. }
                | Self::UpstreamFetchFailed { .. }
                | Self::Timeout { .. }
                | Self::Backend { .. }
                | Self::Io { .. }
        )
    }
}
