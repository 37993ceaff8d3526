use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failure kinds surfaced by the account core.
///
/// Messages are fixed strings (or caller-supplied validation text) and never
/// contain passwords, hashes, secrets or token values.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Not authorized to access this user")]
    Forbidden,

    #[error("User not found")]
    NotFound,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable machine-readable kind.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound => "NOT_FOUND",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::InvalidCredentials
            | AppError::Unauthenticated
            | AppError::TokenInvalid
            | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => error!(error = %e, "database error"),
            AppError::Internal(msg) => error!(error = %msg, "internal error"),
            _ => {}
        }

        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        let mut res = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}
