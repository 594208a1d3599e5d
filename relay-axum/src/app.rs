use std::sync::Arc;

use axum::routing::get;
use axum::{extract::State, Json, Router};
use relay_stream::StreamRelay;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::download::download_router;
use crate::RelayState;

pub struct RelayApp {
    pub relay: Arc<StreamRelay>,
    pub router: Router<()>,
}

impl Clone for RelayApp {
    fn clone(&self) -> Self {
        Self {
            relay: Arc::clone(&self.relay),
            router: self.router.clone(),
        }
    }
}

impl RelayApp {
    /// Download and health routes over the relay.
    ///
    /// Download traffic is traced at `debug` so streaming does not flood the
    /// `info` log; the health routes at `info`.
    pub fn new(relay: StreamRelay) -> Self {
        Self::from_shared(Arc::new(relay))
    }

    pub fn from_shared(relay: Arc<StreamRelay>) -> Self {
        let state = RelayState::from_shared(Arc::clone(&relay));

        let status = Router::new()
            .route("/", get(health))
            .route("/health", get(health))
            .with_state(state.clone())
            .layer(
                TraceLayer::new_for_http()
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            );
        let downloads = download_router(state).layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        );

        Self {
            relay,
            router: status.merge(downloads),
        }
    }

    /// Request ids (generated or propagated `x-request-id`) and permissive CORS
    pub fn with_default_layers(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn axum(relay: StreamRelay) -> RelayApp {
    RelayApp::new(relay)
}

async fn health(State(state): State<RelayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "credentials": state.relay.pool().len(),
    }))
}
