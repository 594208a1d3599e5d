use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_core::errors::{ApiError, ErrorKind};
use relay_stream::RelayError;
use serde_json::json;
use tracing::{debug, error};

#[derive(Debug)]
pub struct RelayAxumError(pub anyhow::Error);

impl From<anyhow::Error> for RelayAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<RelayError> for RelayAxumError {
    fn from(e: RelayError) -> Self {
        Self(anyhow::Error::new(e))
    }
}

impl From<ApiError> for RelayAxumError {
    fn from(e: ApiError) -> Self {
        Self(e.into_anyhow())
    }
}

/// Client-facing error for a relay failure.
///
/// Bad handles are 404, out-of-bounds ranges 416 (with the object size in
/// `data.size`), every backend or session failure 500.
pub fn api_error_for(err: &RelayError) -> ApiError {
    match err {
        RelayError::ObjectNotFound { .. } => ApiError::not_found("File not found"),
        RelayError::RangeNotSatisfiable { size, .. } => {
            ApiError::range_not_satisfiable(err.to_string()).with_data(json!({ "size": size }))
        }
        _ => ApiError::general_error(err.to_string()),
    }
}

impl RelayAxumError {
    /// The structured error this response will carry.
    pub fn to_api_error(&self) -> ApiError {
        for cause in self.0.chain() {
            if let Some(api) = cause.downcast_ref::<ApiError>() {
                return api.clone();
            }
            if let Some(relay) = cause.downcast_ref::<RelayError>() {
                return api_error_for(relay);
            }
        }
        ApiError::general_error(self.0.to_string())
    }
}

impl IntoResponse for RelayAxumError {
    fn into_response(self) -> Response {
        let safe = self.to_api_error();
        let status =
            StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %format!("{:#}", self.0), "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }

        let unsatisfied_size = match safe.kind {
            ErrorKind::RangeNotSatisfiable => safe
                .data
                .as_ref()
                .and_then(|d| d.get("size"))
                .and_then(|s| s.as_u64()),
            _ => None,
        };

        let mut res = (status, Json(safe.to_json())).into_response();
        if let Some(size) = unsatisfied_size {
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                res.headers_mut().insert(header::CONTENT_RANGE, value);
            }
        }
        res
    }
}
