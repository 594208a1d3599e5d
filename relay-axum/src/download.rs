use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use relay_stream::{OpenedObject, RelayCtx};
use tracing::debug;

use crate::filename::{sanitize_file_name, FALLBACK_FILE_NAME};
use crate::range::range_from_headers;
use crate::{RelayAxumError, RelayState};

const REQUEST_ID: &str = "x-request-id";

/// Routes serving `/dl/{handle}/{name}` and `/dl/{handle}`.
///
/// `{name}` only feeds the `Content-Disposition` filename; the object is
/// looked up by handle alone.
pub fn download_router(state: RelayState) -> Router<()> {
    Router::new()
        .route("/dl/{handle}/{name}", get(download_named))
        .route("/dl/{handle}", get(download))
        .with_state(state)
}

async fn download_named(
    State(state): State<RelayState>,
    Path((handle, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, RelayAxumError> {
    serve(&state, &handle, Some(name), &headers).await
}

async fn download(
    State(state): State<RelayState>,
    Path(handle): Path<String>,
    headers: HeaderMap,
) -> Result<Response, RelayAxumError> {
    serve(&state, &handle, None, &headers).await
}

async fn serve(
    state: &RelayState,
    handle: &str,
    name: Option<String>,
    headers: &HeaderMap,
) -> Result<Response, RelayAxumError> {
    let range = range_from_headers(headers);
    let opened = state.relay.open(request_ctx(headers), handle, range).await?;

    let file_name = name
        .as_deref()
        .or_else(|| opened.file_name())
        .map(sanitize_file_name)
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    debug!(
        handle,
        partial = opened.partial,
        length = opened.content_length(),
        "streaming object"
    );
    stream_response(opened, &file_name, &state.relay.config().default_mime_type)
}

fn request_ctx(headers: &HeaderMap) -> RelayCtx {
    let ctx = RelayCtx::new();
    match headers.get(REQUEST_ID).and_then(|v| v.to_str().ok()) {
        Some(id) => ctx.with_request_id(id.to_string()),
        None => ctx,
    }
}

fn stream_response(
    opened: OpenedObject,
    file_name: &str,
    default_mime: &str,
) -> Result<Response, RelayAxumError> {
    let content_type = HeaderValue::from_str(opened.content_type(default_mime))
        .or_else(|_| HeaderValue::from_str(default_mime))
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, opened.content_length())
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{file_name}\""),
        );

    builder = match opened.range.filter(|_| opened.partial) {
        Some(range) => builder.status(StatusCode::PARTIAL_CONTENT).header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, range.end, range.total_size),
        ),
        None => builder.status(StatusCode::OK),
    };

    builder
        .body(Body::from_stream(opened.stream))
        .map_err(|e| RelayAxumError(anyhow::Error::new(e)))
}
