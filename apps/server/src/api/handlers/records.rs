//! Record handlers shared by every collection
//!
//! Each handler is generic over [`RecordKind`] and instantiated once per
//! collection by `routes::records::record_routes`.

use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    api::{
        envelope,
        extractors::{JsonBody, QueryParams},
    },
    auth::AuthenticatedPrincipal,
    models::RecordKind,
    services::records::capitalize,
    state::AppState,
    Error, Result,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    /// Restrict results to records created by this user id
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub name: String,
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

fn plural<K: RecordKind>() -> String {
    format!("{}s", capitalize(K::LABEL))
}

pub(crate) fn owner_of(created_by: &Option<String>) -> Option<&str> {
    created_by.as_deref().filter(|s| !s.trim().is_empty())
}

pub async fn create<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    JsonBody(body): JsonBody,
) -> Result<Response> {
    let data = state.records::<K>().create(&principal, body).await?;
    Ok(envelope::created(
        format!("{} created successfully", capitalize(K::LABEL)),
        data,
    ))
}

pub async fn list<K: RecordKind>(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OwnerQuery>,
) -> Result<Response> {
    let data = state.records::<K>().list(owner_of(&query.created_by)).await?;
    Ok(envelope::list(
        format!("{} retrieved successfully", plural::<K>()),
        data,
    ))
}

pub async fn list_mine<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Response> {
    let data = state.records::<K>().list_mine(&principal).await?;
    Ok(envelope::list(
        format!("Your {}s retrieved successfully", K::LABEL),
        data,
    ))
}

pub async fn list_deleted<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
) -> Result<Response> {
    let data = state.records::<K>().list_deleted(&principal).await?;
    Ok(envelope::list(
        format!("Deleted {}s retrieved successfully", K::LABEL),
        data,
    ))
}

pub async fn search<K: RecordKind>(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<Response> {
    let data = state
        .records::<K>()
        .search(&query.name, owner_of(&query.created_by))
        .await?;
    Ok(envelope::list(
        format!("{} matching '{}' retrieved successfully", plural::<K>(), query.name.trim()),
        data,
    ))
}

pub async fn count<K: RecordKind>(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OwnerQuery>,
) -> Result<Response> {
    let count = state.records::<K>().count(owner_of(&query.created_by)).await?;
    Ok(envelope::ok(
        format!("{} count retrieved successfully", capitalize(K::LABEL)),
        json!({ "count": count }),
    ))
}

pub async fn date_range<K: RecordKind>(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DateRangeQuery>,
) -> Result<Response> {
    let data = state
        .records::<K>()
        .list_by_date_range(
            query.start_date.as_deref(),
            query.end_date.as_deref(),
            owner_of(&query.created_by),
        )
        .await?;
    Ok(envelope::list(
        format!("{} in date range retrieved successfully", plural::<K>()),
        data,
    ))
}

pub async fn bulk_delete<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    JsonBody(body): JsonBody,
) -> Result<Response> {
    let request: BulkDeleteRequest = serde_json::from_value(body)
        .map_err(|_| Error::invalid("ids", "must be an array of record ids"))?;
    let outcome = state
        .records::<K>()
        .bulk_delete(&principal, request.ids)
        .await?;
    Ok(envelope::ok(
        format!("{} {}s deleted successfully", outcome.deleted.len(), K::LABEL),
        json!({
            "deletedCount": outcome.deleted.len(),
            "deletedIds": outcome.deleted,
        }),
    ))
}

pub async fn get<K: RecordKind>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let data = state.records::<K>().get(&id).await?;
    Ok(envelope::ok(
        format!("{} retrieved successfully", capitalize(K::LABEL)),
        data,
    ))
}

/// PUT and PATCH: both merge the body onto the stored record.
pub async fn update<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Response> {
    let data = state.records::<K>().update(&principal, &id, body).await?;
    Ok(envelope::ok(
        format!("{} updated successfully", capitalize(K::LABEL)),
        data,
    ))
}

pub async fn delete<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<Response> {
    let data = state.records::<K>().delete(&principal, &id).await?;
    Ok(envelope::ok(
        format!("{} deleted successfully", capitalize(K::LABEL)),
        data,
    ))
}

pub async fn restore<K: RecordKind>(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<Response> {
    let data = state.records::<K>().restore(&principal, &id).await?;
    Ok(envelope::ok(
        format!("{} restored successfully", capitalize(K::LABEL)),
        data,
    ))
}

/// Audit trail of one record, oldest first.
pub async fn history<K: RecordKind>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    crate::ids::ensure_valid(K::ID_PREFIX, K::ID_FIELD, &id)?;
    let entries = state.audit.history(K::COLLECTION, &id).await?;
    Ok(envelope::list(
        format!("{} history retrieved successfully", capitalize(K::LABEL)),
        entries,
    ))
}
