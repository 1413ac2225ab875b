//! HTTP error handling.
//!
//! Every failure is answered with an [`Outcome`] body (`isSuccess: false`)
//! and a status code chosen from the service error kind.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::repository::RepositoryError;
use crate::outcome::Outcome;
use crate::services::{ServiceError, ServiceErrorKind};

/// Message returned in place of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub struct AppError(pub ServiceError);

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError(ServiceError::validation(message))
    }

    pub fn status(&self) -> StatusCode {
        match self.0.kind {
            ServiceErrorKind::Validation => StatusCode::BAD_REQUEST,
            ServiceErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ServiceErrorKind::NotFound => StatusCode::NOT_FOUND,
            ServiceErrorKind::Conflict => StatusCode::CONFLICT,
            ServiceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body: Outcome<()> = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
            Outcome::failure_message(INTERNAL_ERROR_MESSAGE)
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
            Outcome::from_error(&self.0)
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = AppError::from(err).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (ServiceError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ServiceError::forbidden("x"), StatusCode::FORBIDDEN),
            (ServiceError::not_found("x"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("x"), StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn test_validation_body_lists_every_message() {
        let err = ServiceError::validation_many(vec!["a".to_string(), "b".to_string()]);
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["isSuccess"], false);
        assert_eq!(body["errors"], serde_json::json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_internal_errors_are_masked() {
        let (status, body) = body_of(ServiceError::internal("login failed for sa")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errors"], serde_json::json!([INTERNAL_ERROR_MESSAGE]));
    }
}
