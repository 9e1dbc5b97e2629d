use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type.
///
/// Validation-layer failures (`Unauthorized`, `InvalidCredentials`,
/// `InvalidState`) deliberately carry no detail to the caller; the cause is
/// logged server-side only.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("unknown provider: {0}")]
    ProviderNotFound(String),

    #[error("provider is disabled: {0}")]
    ProviderDisabled(String),

    #[error("provider is misconfigured: {0}")]
    ProviderMisconfigured(String),

    #[error("invalid oauth state")]
    InvalidState,

    #[error("identity provider error: {0}")]
    UpstreamIdentity(anyhow::Error),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("database error: {0}")]
    Database(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(anyhow::Error::new(err))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error, details) = match self {
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized".to_string(), None)
            }
            AppError::ProviderNotFound(code) => (
                StatusCode::NOT_FOUND,
                format!("unknown provider: {}", code),
                None,
            ),
            AppError::ProviderDisabled(code) => (
                StatusCode::FORBIDDEN,
                format!("provider is disabled: {}", code),
                None,
            ),
            AppError::ProviderMisconfigured(code) => {
                tracing::error!(provider = %code, "provider is enabled but misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
            AppError::InvalidState => (
                StatusCode::BAD_REQUEST,
                "invalid oauth state".to_string(),
                None,
            ),
            AppError::UpstreamIdentity(err) => {
                tracing::error!(error = %err, "identity provider exchange failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "identity provider error".to_string(),
                    None,
                )
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid credentials".to_string(),
                None,
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation error".to_string(),
                Some(err.to_string()),
            ),
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
            AppError::Config(err) => {
                tracing::error!(error = %err, "configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}
