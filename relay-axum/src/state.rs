use std::sync::Arc;

use relay_stream::StreamRelay;

/// Router state shared by every relay route
#[derive(Clone)]
pub struct RelayState {
    pub relay: Arc<StreamRelay>,
}

impl RelayState {
    pub fn new(relay: StreamRelay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }

    pub fn from_shared(relay: Arc<StreamRelay>) -> Self {
        Self { relay }
    }
}
