//! Request ID middleware
//!
//! Every request runs inside an `http_request` span and a task-local scope
//! holding the server-assigned request id, so audit rows written while the
//! handler runs can be correlated with the access log.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{Instrument, Span};
use uuid::Uuid;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Request id of the request currently being handled, if any.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Assigns `x-request-id` on the response; a differing client-supplied id is
/// echoed back as `x-correlation-id`.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let route = crate::metrics::route_template(&path);

    let client_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let server_id = Uuid::new_v4().to_string();

    let span = tracing::info_span!(
        "http_request",
        http.method = %method,
        http.route = %route,
        http.response.status_code = tracing::field::Empty,
        request_id = %server_id,
    );

    tracing::debug!(parent: &span, method = %method, path = %path, "Incoming request");

    let mut response = REQUEST_ID
        .scope(server_id.clone(), next.run(req))
        .instrument(span.clone())
        .await;

    let status = response.status();
    span.record("http.response.status_code", status.as_u16());
    record_completion(&span, &method, &path, status.as_u16(), start);

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&server_id) {
        headers.insert("x-request-id", value);
    }
    if let Some(client_id) = client_id.filter(|c| *c != server_id) {
        if let Ok(value) = HeaderValue::from_str(&client_id) {
            headers.insert("x-correlation-id", value);
        }
    }

    response
}

fn record_completion(span: &Span, method: &axum::http::Method, path: &str, status: u16, start: Instant) {
    let duration_ms = start.elapsed().as_millis();
    if status >= 500 {
        tracing::error!(parent: span, method = %method, path, status, duration_ms, "Request failed");
    } else {
        tracing::info!(parent: span, method = %method, path, status, duration_ms, "Request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_id_is_scoped_to_the_task() {
        assert_eq!(current_request_id(), None);
        let seen = REQUEST_ID
            .scope("req-1".to_string(), async { current_request_id() })
            .await;
        assert_eq!(seen.as_deref(), Some("req-1"));
        assert_eq!(current_request_id(), None);
    }
}
