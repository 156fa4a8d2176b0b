//! Notification inbox handlers

use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;

use crate::{
    api::{envelope, extractors::QueryParams},
    auth::AuthenticatedPrincipal,
    state::AppState,
    Result,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    QueryParams(query): QueryParams<InboxQuery>,
) -> Result<Response> {
    let data = state
        .notifications
        .list(&principal, query.unread_only)
        .await?;
    Ok(envelope::list("Notifications retrieved successfully", data))
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
) -> Result<Response> {
    let data = state.notifications.mark_read(&principal, &id).await?;
    Ok(envelope::ok("Notification marked as read", data))
}
