use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::api_state::ApiState;

/// Health probe: UP when the vector store answers, DEGRADED otherwise.
/// Always 200 so orchestrators can distinguish degraded from dead.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let status = match state.vector_store.ping().await {
        Ok(()) => "UP",
        Err(e) => {
            tracing::warn!(error = %e, "vector store ping failed");
            "DEGRADED"
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
