use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::HubError;

/// Extension type injected into every request so the middleware can read the
/// configured shared key.
#[derive(Clone)]
pub struct AccessKey(pub String);

/// Axum middleware: require the shared key when one is configured.
///
/// The board front-end sends `?key=<secret>`; scripted callers may use
/// `Authorization: Bearer <secret>` instead.  An empty configured key leaves
/// the API open.
pub async fn require_key(request: Request, next: Next) -> Response {
    let key = request
        .extensions()
        .get::<AccessKey>()
        .map(|k| k.0.clone())
        .unwrap_or_default();

    // No key configured ⇒ allow all.
    if key.is_empty() {
        return next.run(request).await;
    }

    let offered = request.uri().query().and_then(query_key);
    if let Some(candidate) = offered {
        if constant_time_eq(candidate.as_bytes(), key.as_bytes()) {
            return next.run(request).await;
        }
    }

    let auth_header = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let expected = format!("Bearer {key}");
    if constant_time_eq(auth_header.as_bytes(), expected.as_bytes()) {
        return next.run(request).await;
    }

    HubError::Unauthorized.into_response()
}

/// Pull the `key` parameter out of the query string, percent-decoded.
///
/// The board runs the key through `encodeURIComponent`, so reserved
/// characters arrive as `%26`-style escapes and must be decoded before
/// comparison.
fn query_key(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == "key")
        .map(|(_, value)| value.into_owned())
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
