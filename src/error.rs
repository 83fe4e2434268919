use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Field name -> list of messages, as returned in the `fields` member of
/// validation error responses.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error type shared by the stores and the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request data failed validation. Maps to 400.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// Email/password pair was rejected. Deliberately carries no detail
    /// about which of the two was wrong. Maps to 400.
    #[error("Unable to authenticate with provided credentials")]
    InvalidCredentials,

    /// No token, or a token that does not resolve to an active user. Maps to 401.
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,

    /// Row does not exist or belongs to another user. Maps to 404.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Validation error for a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(fields)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, field_errors)| {
                let messages = field_errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({})", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::Validation(fields)
    }
}

/// Convert AppError to an HTTP response with an `ErrorResponse` body.
///
/// Database and internal failures are logged here and reported to the
/// client with a generic message only.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code().to_string();

        let (message, fields) = match self {
            AppError::Validation(fields) => ("Validation failed".to_string(), Some(fields)),
            AppError::Database(ref e) => {
                error!("Database error: {}", e);
                ("Internal server error".to_string(), None)
            }
            AppError::Internal(ref msg) => {
                error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            error: message,
            code,
            success: false,
            fields,
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "This field may not be blank."))]
        name: String,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::field("name", "bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("Tag").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_errors_keep_field_names() {
        let errors = Payload {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        match AppError::from(errors) {
            AppError::Validation(fields) => {
                assert_eq!(
                    fields.get("name"),
                    Some(&vec!["This field may not be blank.".to_string()])
                );
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unauthenticated_sets_challenge_header() {
        let response = AppError::Unauthenticated.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Token"
        );
    }
}
