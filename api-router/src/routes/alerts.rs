use axum::{
    extract::rejection::JsonRejection, extract::State, http::StatusCode, response::IntoResponse,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{api_state::ApiState, error::ApiError};

/// Ingests one alert: normalize, synthesize the checklist, fan it out, and
/// return the checklist synchronously.
///
/// Validation of the canonical form happens before any enrichment adapter or
/// model is consulted; dispatch failures never fail the request.
pub async fn ingest_alert(
    State(state): State<ApiState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(raw) = payload.map_err(ApiError::from)?;

    let alert = state
        .normalizers
        .normalize(&raw)
        .map_err(|err| ApiError::from_app(err, correlation_id.clone()))?;
    let severity = alert.severity();

    info!(
        correlation_id = %correlation_id,
        alert_id = %alert.id(),
        severity = %severity,
        source_service = %alert.source_service(),
        "alert accepted"
    );

    let checklist = state
        .pipeline
        .process_alert(alert, state.config.retrieval.top_k, Some(correlation_id.clone()))
        .await
        .map_err(|err| ApiError::from_app(err, correlation_id.clone()))?;

    let results = state.dispatcher.dispatch(&checklist, severity).await;
    let delivered = results
        .iter()
        .filter(|r| r.status == common::types::webhook::WebhookStatus::Success)
        .count();
    info!(
        correlation_id = %correlation_id,
        alert_id = %checklist.alert_id,
        destinations = results.len(),
        delivered,
        "checklist dispatched"
    );

    Ok((StatusCode::OK, Json(checklist)))
}
