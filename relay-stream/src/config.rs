use std::time::Duration;

use relay_core::ConfigSnapshot;

/// Fixed transfer unit of the remote fetch protocol (1 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Configuration for relay operations
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bytes requested per remote fetch; every fetch offset is a multiple of it
    pub chunk_size: u64,

    /// Upper bound for a single chunk fetch
    pub fetch_timeout: Duration,

    /// Upper bound for establishing a session, handoff included
    pub session_timeout: Duration,

    /// Upper bound for resolving a handle into an object
    pub resolve_timeout: Duration,

    /// Content type used when the stored object declares none
    pub default_mime_type: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            fetch_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(30),
            resolve_timeout: Duration::from_secs(15),
            default_mime_type: "application/octet-stream".to_string(),
        }
    }
}

impl RelayConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `relay.*` keys from a config snapshot, keeping defaults for absent ones.
    ///
    /// A zero chunk size is ignored.
    pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
        let mut config = Self::default();
        if let Some(size) = snapshot.get_u64("relay.chunk_size").filter(|s| *s > 0) {
            config.chunk_size = size;
        }
        if let Some(timeout) = snapshot.get_duration_secs("relay.fetch_timeout_secs") {
            config.fetch_timeout = timeout;
        }
        if let Some(timeout) = snapshot.get_duration_secs("relay.session_timeout_secs") {
            config.session_timeout = timeout;
        }
        if let Some(timeout) = snapshot.get_duration_secs("relay.resolve_timeout_secs") {
            config.resolve_timeout = timeout;
        }
        if let Some(mime) = snapshot.get_string("relay.default_mime_type") {
            config.default_mime_type = mime;
        }
        config
    }

    /// Set chunk size
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    /// Set fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set session establishment timeout
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Set resolve timeout
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_default_mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.default_mime_type = mime.into();
        self
    }
}
