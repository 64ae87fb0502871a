use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub const UNAUTHORIZED_MESSAGE: &str = "You are not authorized to access this resource.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource could not be found.";
pub const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Audit attribution missing for {0}")]
    AuditAttributionMissing(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TooManyRequests(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::AuditAttributionMissing(_)
            | AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        AppError::Unauthorized(anyhow::anyhow!(reason.into()))
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(anyhow::anyhow!(reason.into()))
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        AppError::NotFound(anyhow::anyhow!(reason.into()))
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        AppError::BadRequest(anyhow::anyhow!(reason.into()))
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        AppError::Conflict(anyhow::anyhow!(reason.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 401 and 404 never reveal why, 5xx never reveal internals.
        let (message, retry_after) = match &self {
            AppError::ValidationError(err) => (err.to_string(), None),
            AppError::BadRequest(err) | AppError::Conflict(err) | AppError::Forbidden(err) => {
                (err.to_string(), None)
            }
            AppError::Unauthorized(_) => (UNAUTHORIZED_MESSAGE.to_string(), None),
            AppError::NotFound(_) => (NOT_FOUND_MESSAGE.to_string(), None),
            AppError::TooManyRequests(msg, retry) => (msg.clone(), *retry),
            AppError::ServiceUnavailable => ("Service unavailable".to_string(), None),
            AppError::AuditAttributionMissing(_)
            | AppError::InternalError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_) => (INTERNAL_MESSAGE.to_string(), None),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut res = (
            status,
            Json(ErrorBody {
                error: status.canonical_reason().unwrap_or("Error").to_string(),
                message,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_unauthorized_message_is_generic() {
        let (status, body) = body_json(AppError::unauthorized("wrong password for bob")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], UNAUTHORIZED_MESSAGE);
    }

    #[tokio::test]
    async fn test_not_found_message_is_generic() {
        let (status, body) = body_json(AppError::not_found("collection 42 hidden")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["message"], NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn test_audit_attribution_missing_is_internal() {
        let (status, body) = body_json(AppError::AuditAttributionMissing("materials".into())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_conflict_keeps_reason() {
        let (status, body) = body_json(AppError::conflict("email already exists")).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "email already exists");
    }

    #[test]
    fn test_too_many_requests_sets_retry_after() {
        let response = AppError::TooManyRequests("slow down".into(), Some(30)).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[axum::http::header::RETRY_AFTER], "30");
    }
}
