//! Prescription PDF export

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::{
    models::Prescriptions,
    services::{render_prescription, RenderedPdf},
    state::AppState,
    Error, Result,
};

pub async fn export(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let service = state.records::<Prescriptions>();
    let record = service.get_record(&id).await?;
    let prescription = service
        .payload_of(&record)
        .ok_or_else(|| Error::Export(format!("Prescription {id} cannot be rendered")))?;

    // Layout is CPU-bound; keep it off the async workers.
    let config = state.config.export.clone();
    let code = record.code.clone();
    let pdf = tokio::task::spawn_blocking(move || render_prescription(&prescription, &code, &config))
        .await
        .map_err(|e| Error::Internal(format!("PDF render task failed: {e}")))??;

    tracing::info!(code = %record.code, bytes = pdf.bytes.len(), "Prescription exported");
    Ok(pdf_response(pdf))
}

fn pdf_response(pdf: RenderedPdf) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", pdf.filename);
    let mut response = pdf.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
