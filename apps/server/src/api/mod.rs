//! API layer - routes, handlers, and middleware

pub mod envelope;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, routing::get, Router};

use handlers::system;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    let api_router = Router::new()
        .merge(routes::records::collection_routes())
        .nest(
            "/notifications",
            routes::notifications::notification_routes(),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(system::health_check))
        .route("/", get(system::root))
        .merge(routes::metrics::metrics_routes())
        .nest("/api", api_router)
        .fallback(system::not_found)
        .with_state(state)
        // Applied bottom-up: the body limit is outermost.
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(middleware::compression())
        .layer(middleware::cors(&cors_origins))
        .layer(DefaultBodyLimit::max(max_body_size))
}
