use axum::{
    extract::rejection::JsonRejection, extract::State, http::StatusCode, response::IntoResponse,
    Json,
};
use uuid::Uuid;

use common::types::webhook::WebhookConfig;

use crate::{api_state::ApiState, error::ApiError};

/// Lists the registered destinations.
pub async fn list_webhooks(State(state): State<ApiState>) -> impl IntoResponse {
    let configs = state.dispatcher.configs().await;
    (StatusCode::OK, Json(configs))
}

/// Registers a new destination; duplicate names are a conflict.
pub async fn create_webhook(
    State(state): State<ApiState>,
    payload: Result<Json<WebhookConfig>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(config) = payload.map_err(ApiError::from)?;

    let registered = state
        .dispatcher
        .register(config)
        .await
        .map_err(|err| ApiError::from_app(err, correlation_id))?;

    Ok((StatusCode::CREATED, Json(registered)))
}
