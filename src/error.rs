//! Error handler for newsfeed.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::account::{AccountError, ErrorKind};

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("invalid 'Authorization' header")]
    Unauthorized,
}

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    error_code: String,
    error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// HTTP status answered for an account failure.
pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::DuplicateAccount => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::AccountNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidRefreshToken => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::CredentialMismatch
        | ErrorKind::AlreadyWithdrawn
        | ErrorKind::InvalidPassword
        | ErrorKind::Validation => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ServerError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ResponseError {
                    error_code: "400".into(),
                    error_message: "There were validation errors with your request.".into(),
                    errors: Some(parse_validation_errors(errors)),
                },
            ),

            ServerError::Axum(rejection) => (
                StatusCode::BAD_REQUEST,
                ResponseError {
                    error_code: "400".into(),
                    error_message: rejection.body_text(),
                    errors: None,
                },
            ),

            ServerError::Account(err) => {
                let kind = err.kind();
                let message = if kind == ErrorKind::Internal {
                    tracing::error!(error = %err, "server returned 500 status");
                    "Internal server error.".to_owned()
                } else {
                    err.to_string()
                };
                let errors = match err {
                    AccountError::Validation { field, message } => Some(vec![FieldError {
                        field: field.to_string(),
                        message: message.clone(),
                    }]),
                    _ => None,
                };

                (
                    status_code(kind),
                    ResponseError {
                        error_code: kind.error_code().into(),
                        error_message: message,
                        errors,
                    },
                )
            },

            ServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ResponseError {
                    error_code: "401".into(),
                    error_message: "Missing or invalid 'Authorization' header.".into(),
                    errors: None,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use validator::ValidationError;

    use super::*;
    use crate::account::StoreError;

    async fn body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_account() {
        let response = ServerError::from(AccountError::DuplicateAccount).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body(response).await;
        assert_eq!(body["errorCode"], "400");
        assert_eq!(body["errorMessage"], "duplicate user exists");
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_is_hidden() {
        let err = AccountError::from(StoreError::Corrupted("account 42: bad role".into()));
        let response = ServerError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body(response).await;
        assert_eq!(body["errorCode"], "500");
        assert!(!body["errorMessage"].as_str().unwrap().contains("bad role"));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "email",
            ValidationError::new("email").with_message("Invalid email.".into()),
        );

        let response = ServerError::from(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body(response).await;
        assert_eq!(body["errorCode"], "400");
        assert_eq!(body["errors"][0]["field"], "email");
        assert_eq!(body["errors"][0]["message"], "Invalid email.");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(ErrorKind::AccountNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_code(ErrorKind::CredentialMismatch), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(ErrorKind::AlreadyWithdrawn), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(ErrorKind::InvalidPassword), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(ErrorKind::InvalidRefreshToken),
            StatusCode::UNAUTHORIZED
        );
    }
}
