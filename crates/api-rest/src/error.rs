//! Mapping from domain errors to HTTP responses.
//!
//! Every error response carries an [`ErrorRes`] body. Internal failures are logged here and
//! reported to the client with a generic message.

use api_shared::{AuthError, ErrorRes};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cardcrafter_core::{ConfigError, GenerationError, IdentityError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Generation(e) => {
                let status = match e {
                    GenerationError::UpstreamUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.kind())
            }
            ApiError::Identity(e) => match e {
                IdentityError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
                IdentityError::EmailExists => (StatusCode::CONFLICT, "email_exists"),
                IdentityError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
                IdentityError::Rejected(_) => (StatusCode::BAD_REQUEST, "identity_rejected"),
                IdentityError::Transport(_) | IdentityError::InvalidResponse(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "identity_unavailable")
                }
            },
            ApiError::Store(e) => match e {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            },
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();

        let message = if status.is_server_error() {
            tracing::error!("{kind}: {self}");
            "internal error".to_owned()
        } else {
            self.to_string()
        };

        (
            status,
            Json(ErrorRes {
                error: kind.to_owned(),
                message,
            }),
        )
            .into_response()
    }
}
