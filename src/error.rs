use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for hub operations and API responses.
///
/// `Fetch` and `Validation` are recoverable inside the reconciler (it falls
/// back to the cached snapshots); they only reach a response when no snapshot
/// exists, in which case `NoData` is what the caller sees.
#[derive(Debug)]
pub enum HubError {
    /// Upstream unreachable, timed out, or non-2xx.
    Fetch(String),
    /// Upstream payload was not usable (not an array, or nothing survived
    /// entry validation).
    Validation(String),
    /// Fetch failed and the store holds no snapshot to fall back to.
    NoData,
    /// Persistence layer failure.
    Storage(String),
    Unauthorized,
    Internal(String),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(msg) => write!(f, "fetch_failed: {msg}"),
            Self::Validation(msg) => write!(f, "invalid_payload: {msg}"),
            Self::NoData => write!(f, "no_data_available"),
            Self::Storage(msg) => write!(f, "storage_error: {msg}"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for HubError {}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Fetch(_) | Self::Validation(_) => StatusCode::BAD_GATEWAY,
            Self::NoData => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for HubError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for HubError {
    fn from(e: r2d2::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for HubError {
    fn from(e: reqwest::Error) -> Self {
        Self::Fetch(e.to_string())
    }
}
