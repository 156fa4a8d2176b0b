//! Metrics middleware - counts HTTP requests by route template and status

use axum::{extract::Request, middleware::Next, response::Response};

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let route = crate::metrics::route_template(req.uri().path());

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &route, &status])
        .inc();

    response
}
