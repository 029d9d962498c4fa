use api_state::ApiState;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use routes::{
    alerts::ingest_alert,
    health::health,
    runbooks::sync_runbooks,
    webhooks::{create_webhook, list_webhooks},
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    Router::new()
        .route("/health", get(health))
        .route("/alerts", post(ingest_alert))
        .route("/runbooks/sync", post(sync_runbooks))
        .route("/webhooks", get(list_webhooks).post(create_webhook))
}
