use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use common::error::AppError;
use serde::Serialize;
use uuid::Uuid;

/// API-facing error: an error-taxonomy code plus the correlation id that ties
/// the response to the request's log events.
#[derive(Debug)]
pub struct ApiError {
    pub correlation_id: String,
    pub status: StatusCode,
    pub error_code: &'static str,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn validation(correlation_id: String, message: String, details: Option<String>) -> Self {
        Self {
            correlation_id,
            status: StatusCode::BAD_REQUEST,
            error_code: "VALIDATION_ERROR",
            message,
            details,
        }
    }

    /// Maps an internal error onto the taxonomy, unwrapping the pipeline
    /// stage wrapper so the underlying kind decides the status.
    pub fn from_app(err: AppError, correlation_id: String) -> Self {
        let (status, error_code, message, details) = classify(&err);
        tracing::error!(
            correlation_id = %correlation_id,
            error_code,
            error = %err,
            "request failed"
        );
        Self {
            correlation_id,
            status,
            error_code,
            message,
            details,
        }
    }
}

fn classify(err: &AppError) -> (StatusCode, &'static str, String, Option<String>) {
    match err {
        AppError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            message.clone(),
            Some(message.clone()),
        ),
        AppError::Conflict(message) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            message.clone(),
            Some(message.clone()),
        ),
        AppError::NotFound(message) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            message.clone(),
            None,
        ),
        AppError::Timeout(message) => (
            StatusCode::GATEWAY_TIMEOUT,
            "TIMEOUT",
            message.clone(),
            None,
        ),
        AppError::Upstream(message) => (
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_UNAVAILABLE",
            message.clone(),
            None,
        ),
        AppError::LLMParsing(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "PARSE_ERROR",
            message.clone(),
            None,
        ),
        AppError::PipelineStage { stage, source } => {
            let (status, code, _, _) = classify(source);
            (
                status,
                code,
                format!("{stage} stage failed"),
                Some(source.to_string()),
            )
        }
        other => {
            // Internal kinds are not leaked to callers verbatim.
            tracing::error!("Internal error: {other:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                None,
            )
        }
    }
}

impl From<axum::extract::rejection::JsonRejection> for ApiError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        Self::validation(
            Uuid::new_v4().to_string(),
            "request body is not valid JSON".into(),
            Some(err.to_string()),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    correlation_id: String,
    error_code: &'static str,
    message: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            correlation_id: self.correlation_id,
            error_code: self.error_code,
            message: self.message,
            timestamp: Utc::now().to_rfc3339(),
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> (StatusCode, &'static str) {
        let api = ApiError::from_app(err, "corr".into());
        (api.status, api.error_code)
    }

    #[test]
    fn test_taxonomy_mapping() {
        assert_eq!(
            status_of(AppError::Validation("bad".into())),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
        assert_eq!(
            status_of(AppError::Conflict("dup".into())),
            (StatusCode::CONFLICT, "CONFLICT")
        );
        assert_eq!(
            status_of(AppError::NotFound("gone".into())),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            status_of(AppError::Timeout("slow".into())),
            (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT")
        );
        assert_eq!(
            status_of(AppError::Upstream("down".into())),
            (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE")
        );
        assert_eq!(
            status_of(AppError::InternalError("boom".into())),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }

    #[test]
    fn test_pipeline_stage_wrapper_unwraps_to_source_kind() {
        let err = AppError::Timeout("llm too slow".into()).in_stage("generate");
        let api = ApiError::from_app(err, "corr".into());
        assert_eq!(api.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(api.error_code, "TIMEOUT");
        assert!(api.message.contains("generate"));
        assert!(api.details.as_deref().is_some_and(|d| d.contains("llm too slow")));
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let err = AppError::InternalError("db password incorrect".into());
        let api = ApiError::from_app(err, "corr".into());
        assert_eq!(api.message, "Internal server error");
        assert!(api.details.is_none());
    }

    #[test]
    fn test_error_body_serializes_taxonomy_fields() {
        let api = ApiError::validation(
            "11111111-2222-3333-4444-555555555555".into(),
            "title is required".into(),
            Some("title is required".into()),
        );
        let response = api.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
