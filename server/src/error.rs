use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;

use crate::db::SqlError;
use crate::jwt::TokenError;
use crate::protection::DenyReason;
use crate::validation::{FieldError, ValidationErrors};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] SqlError),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request body")]
    InvalidBody(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    EmailTaken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Too many requests")]
    RateLimitExceeded,

    #[error("{0}")]
    Forbidden(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::RateLimit => ApiError::RateLimitExceeded,
            DenyReason::Bot(_) => ApiError::Forbidden("Automated requests are not allowed".into()),
            DenyReason::Shield => {
                ApiError::Forbidden("Request blocked by security policy".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [FieldError]>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Token(TokenError::Verification) => StatusCode::UNAUTHORIZED,
            ApiError::Token(TokenError::Signing) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Server-side failures are logged in full but never echoed to clients.
        let error = if status.is_server_error() {
            log::error!("Request failed: {:?}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let details = match self {
            ApiError::Validation(errors) => Some(errors.errors()),
            _ => None,
        };

        HttpResponse::build(status).json(ErrorResponse {
            success: false,
            error,
            details,
        })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
