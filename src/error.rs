use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{models::InvalidFilter, validation::Violations};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(Violations),
    #[error("URL and body id mismatch")]
    IdMismatch,
    #[error("Modification of rating not allowed because rating is not set")]
    RatingNotSet,
    #[error("Modification of rating would yield a value out of valid range")]
    RatingOutOfRange,
    #[error(transparent)]
    InvalidFilter(#[from] InvalidFilter),
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error("Film not found.")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// Store failure while reading a single film; answered with a bare 500.
    #[error("database error during lookup: {0}")]
    LookupFailed(sea_orm::DbErr),
}

impl From<Violations> for AppError {
    fn from(errors: Violations) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::IdMismatch
            | AppError::RatingNotSet
            | AppError::RatingOutOfRange => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidFilter(_) | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::LookupFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        match self {
            AppError::Validation(errors) => (status, Json(errors)).into_response(),
            AppError::Database(_) => {
                (status, Json(json!({ "error": "Database error" }))).into_response()
            },
            AppError::LookupFailed(_) => status.into_response(),
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(AppError::IdMismatch.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::RatingOutOfRange.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(InvalidFilter("newest".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(sea_orm::DbErr::Custom("disk full".to_string())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::LookupFailed(sea_orm::DbErr::Custom("disk full".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_matches_wire_contract() {
        assert_eq!(AppError::NotFound.to_string(), "Film not found.");
    }
}
