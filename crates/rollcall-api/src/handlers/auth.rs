//! Authentication API handlers
//!
//! Login is public; logout and me sit behind the auth middleware and read
//! the identity it resolved from request extensions.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{
    AuthError, AuthenticatedIdentity, BearerToken, LoginRequest, LoginResponse, LogoutOutcome,
    LogoutResponse,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

pub const LOGOUT_MESSAGE: &str = "Successfully logged out!";

/// Login with username and password
///
/// Unknown user, wrong password and disabled account all answer with the
/// same 401 body.
///
/// # Responses
///
/// * `200 OK` - Signed access token
/// * `400 Bad Request` - Body is not a login request
/// * `401 Unauthorized` - Invalid credentials
/// * `503 Service Unavailable` - Credential store or hasher did not answer
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 503, description = "Authentication unavailable", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let result = state.auth.login(&request.username, &request.password).await;
    state.metrics.record_login(result.is_ok());

    match result {
        Ok(issued) => {
            audit_log(&AuditEvent::LoginSuccess {
                subject: issued.claims.sub.clone(),
                username: request.username,
                ip_address,
                user_agent,
            });

            Ok(Json(LoginResponse {
                access_token: issued.token,
                token_type: "Bearer".to_string(),
                expires_in: issued.claims.exp.saturating_sub(issued.claims.iat),
            }))
        }
        Err(e) => {
            let event = match &e {
                AuthError::AuthUnavailable(reason) => AuditEvent::AuthUnavailable {
                    operation: "login".to_string(),
                    reason: reason.clone(),
                },
                _ => AuditEvent::LoginFailure {
                    username: request.username,
                    reason: e.reason().to_string(),
                    ip_address,
                    user_agent,
                },
            };
            audit_log(&event);

            Err(e.into())
        }
    }
}

/// Logout the current token
///
/// Records the token as revoked for the rest of its lifetime. Also routed
/// as POST. Repeating the call with the same token is rejected by the auth
/// middleware.
#[utoipa::path(
    get,
    path = "/api/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
        (status = 401, description = "Missing, invalid, expired or revoked token", body = crate::error::ApiError),
        (status = 503, description = "Revocation store unavailable", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<impl IntoResponse, AppError> {
    match state.auth.logout(&token).await? {
        LogoutOutcome::Revoked { token_id, subject } => {
            audit_log(&AuditEvent::Logout {
                subject,
                token_id,
                ip_address: extract_ip_address(&headers),
            });
        }
        // Expired between the middleware check and now
        LogoutOutcome::AlreadyInvalid => {}
    }

    Ok(Json(LogoutResponse {
        message: LOGOUT_MESSAGE.to_string(),
    }))
}

/// Identity behind the current token
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current identity", body = AuthenticatedIdentity),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(Extension(identity): Extension<AuthenticatedIdentity>) -> impl IntoResponse {
    Json(identity)
}
