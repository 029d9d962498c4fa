use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection, extract::State, http::StatusCode, response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub force_refresh: Option<bool>,
}

/// Triggers a re-ingestion run in the background and replies immediately.
/// Ingestion replaces per-document chunks regardless, so `forceRefresh` only
/// shows up in the run's logs.
pub async fn sync_runbooks(
    State(state): State<ApiState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        // A missing body means "sync everything".
        Err(JsonRejection::MissingJsonContentType(_)) | Err(JsonRejection::JsonSyntaxError(_)) => {
            SyncRequest::default()
        }
        Err(rejection) => return Err(ApiError::from(rejection)),
    };

    let request_id = Uuid::new_v4().to_string();
    if let Some(bucket) = &request.bucket_name {
        if bucket != &state.config.runbooks.bucket {
            warn!(
                request_id = %request_id,
                requested = %bucket,
                configured = %state.config.runbooks.bucket,
                "sync requested for a different bucket; using the configured one"
            );
        }
    }

    let ingestion = Arc::clone(&state.ingestion);
    let prefix = request.prefix.clone();
    let force_refresh = request.force_refresh.unwrap_or(false);
    let task_request_id = request_id.clone();
    tokio::spawn(async move {
        info!(request_id = %task_request_id, ?prefix, force_refresh, "runbook sync started");
        match ingestion.ingest_all(prefix.as_deref()).await {
            Ok(report) => info!(
                request_id = %task_request_id,
                documents = report.documents_processed,
                chunks = report.chunks_stored,
                failed = report.errors.len(),
                "runbook sync finished"
            ),
            Err(err) => warn!(
                request_id = %task_request_id,
                error = %err,
                "runbook sync failed"
            ),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "STARTED",
            "requestId": request_id,
            "documentsProcessed": 0,
            "errors": [],
        })),
    ))
}
