//! JSON response envelopes
//!
//! Single items: `{ "message", "data" }`. Lists add `total` and an RFC 3339
//! `timestamp`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    envelope(StatusCode::OK, message.into(), data)
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    envelope(StatusCode::CREATED, message.into(), data)
}

pub fn list<T: Serialize>(message: impl Into<String>, items: Vec<T>) -> Response {
    let total = items.len();
    (
        StatusCode::OK,
        Json(json!({
            "message": message.into(),
            "data": items,
            "total": total,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

fn envelope<T: Serialize>(status: StatusCode, message: String, data: T) -> Response {
    (status, Json(json!({ "message": message, "data": data }))).into_response()
}
