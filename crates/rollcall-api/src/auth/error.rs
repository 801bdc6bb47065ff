//! Authentication error taxonomy
//!
//! Variants stay distinct for logs, audit events and metrics; at the HTTP
//! boundary every token failure collapses into one 401 body.

use super::jwt::TokenError;
use crate::error::ApiError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password and disabled account look the same
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Missing or malformed bearer token")]
    MissingToken,

    /// A dependency could not answer in time; access is denied
    #[error("Authentication backend unavailable: {0}")]
    AuthUnavailable(String),

    #[error("Internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AuthUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Short label for metrics and audit records
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::TokenRevoked => "revoked",
            AuthError::MissingToken => "missing_token",
            AuthError::AuthUnavailable(_) => "unavailable",
            AuthError::Internal(_) => "internal",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Expired => AuthError::Expired,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AuthError::InvalidCredentials => {
                ApiError::new("UNAUTHORIZED", "Invalid username or password")
            }
            AuthError::MissingToken => ApiError::unauthorized(),
            AuthError::InvalidSignature | AuthError::Expired | AuthError::TokenRevoked => {
                ApiError::new("UNAUTHORIZED", "Invalid or expired token")
            }
            AuthError::AuthUnavailable(_) => ApiError::new(
                "AUTH_UNAVAILABLE",
                "Authentication service temporarily unavailable",
            ),
            AuthError::Internal(_) => ApiError::internal_error(),
        };

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}
