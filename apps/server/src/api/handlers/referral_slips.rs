//! Referral-slip specific handlers

use axum::{
    extract::{Path, State},
    response::Response,
};

use super::records::{owner_of, OwnerQuery};
use crate::{
    api::{
        envelope,
        extractors::{JsonBody, QueryParams},
    },
    auth::AuthenticatedPrincipal,
    models::ReferralSlips,
    state::AppState,
    Result,
};

pub async fn update_return_slip(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    Path(id): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<Response> {
    let data = state
        .records::<ReferralSlips>()
        .update_return_slip(&principal, &id, body)
        .await?;
    Ok(envelope::ok("Return slip updated successfully", data))
}

pub async fn pending_return(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OwnerQuery>,
) -> Result<Response> {
    let data = state
        .records::<ReferralSlips>()
        .list_pending_return(owner_of(&query.created_by))
        .await?;
    Ok(envelope::list(
        "Referral slips pending return retrieved successfully",
        data,
    ))
}

pub async fn completed(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<OwnerQuery>,
) -> Result<Response> {
    let data = state
        .records::<ReferralSlips>()
        .list_completed(owner_of(&query.created_by))
        .await?;
    Ok(envelope::list(
        "Completed referral slips retrieved successfully",
        data,
    ))
}

pub async fn by_referrer(
    State(state): State<AppState>,
    Path(name): Path<String>,
    QueryParams(query): QueryParams<OwnerQuery>,
) -> Result<Response> {
    let data = state
        .records::<ReferralSlips>()
        .list_by_referrer(&name, owner_of(&query.created_by))
        .await?;
    Ok(envelope::list(
        format!("Referral slips referred by '{}' retrieved successfully", name.trim()),
        data,
    ))
}
