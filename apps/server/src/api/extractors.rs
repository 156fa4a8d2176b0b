//! Custom Axum extractors

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::{validation::FieldError, Error};

/// JSON request body as an untyped value.
///
/// Schema validation happens in the services; this only rejects bodies that
/// are not JSON at all, using the API's error envelope instead of axum's
/// plain-text rejection.
pub struct JsonBody(pub JsonValue);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<JsonValue>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(map_rejection(rejection)),
        }
    }
}

fn map_rejection(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        JsonRejection::JsonSyntaxError(e) => format!("Malformed JSON body: {e}"),
        other => other.body_text(),
    };
    if status.is_client_error() && status != axum::http::StatusCode::BAD_REQUEST {
        // 413 for oversized bodies, 415 for wrong content types
        return (status, Json(serde_json::json!({ "message": message }))).into_response();
    }
    Error::BadRequest(message).into_response()
}

/// Typed query string. Rejections are reported as a validation error on `query`.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| QueryParams(value))
            .map_err(|rejection| {
                Error::Validation(vec![FieldError::new("query", rejection.body_text())])
            })
    }
}

