//! Request ID middleware for tracing and error correlation.
//!
//! Every request gets an ID: the upstream proxy's `x-request-id` when present
//! and well formed, a UUID v4 otherwise. The ID is recorded on the request
//! span, tagged on the Sentry scope, stored as a [`RequestId`] extension (the
//! error page prints it) and echoed back in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream ID accepted as is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// The ID of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Accept an upstream ID only if it is short, visible ASCII.
fn sanitize(upstream: &str) -> Option<&str> {
    let valid = !upstream.is_empty()
        && upstream.len() <= MAX_REQUEST_ID_LEN
        && upstream.bytes().all(|b| b.is_ascii_graphic());
    valid.then_some(upstream)
}

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(sanitize)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", request_id.as_str());

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
