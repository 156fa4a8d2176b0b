//! Annual accomplishment report generation

use axum::{extract::State, response::Response};

use crate::{
    api::{envelope, extractors::JsonBody},
    auth::AuthenticatedPrincipal,
    models::AnnualReports,
    state::AppState,
    Result,
};

pub async fn auto_generate(
    State(state): State<AppState>,
    AuthenticatedPrincipal(principal): AuthenticatedPrincipal,
    JsonBody(body): JsonBody,
) -> Result<Response> {
    let sources = state.report_sources();
    let data = state
        .records::<AnnualReports>()
        .auto_generate(&principal, body, &sources)
        .await?;
    Ok(envelope::created(
        "Annual accomplishment report generated successfully",
        data,
    ))
}
