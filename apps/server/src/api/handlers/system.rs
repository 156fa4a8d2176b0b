//! Health and informational endpoints

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{state::AppState, Error};

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "school-health"
    }))
}

pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "server": "School Health Records API",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.logging.deployment_environment,
        "status": "running"
    }))
}

pub async fn not_found() -> Error {
    Error::NotFound("Route not found".to_string())
}
