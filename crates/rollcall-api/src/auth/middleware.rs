/// Authentication middleware for protecting routes
///
/// Extracts the bearer token from the Authorization header and asks the
/// session manager to authorize it. On success the resolved identity is
/// added to request extensions; on failure the request is answered here and
/// the inner handler never runs.
use super::error::AuthError;
use super::models::BearerToken;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authentication middleware that requires a valid, unrevoked token
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use rollcall_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
///
/// In handlers, extract the identity:
///
/// ```
/// use axum::Extension;
/// use rollcall_api::auth::AuthenticatedIdentity;
///
/// async fn protected_handler(
///     Extension(identity): Extension<AuthenticatedIdentity>
/// ) -> String {
///     format!("Hello, {}!", identity.subject)
/// }
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let outcome = match extract_bearer_token(request.headers()) {
        Ok(token) => state
            .auth
            .authorize(&token)
            .await
            .map(|identity| (identity, token)),
        Err(e) => Err(e),
    };
    state.metrics.record_authorization(&outcome);

    match outcome {
        Ok((identity, token)) => {
            request.extensions_mut().insert(identity);
            request.extensions_mut().insert(BearerToken(token));
            Ok(next.run(request).await)
        }
        Err(e) => {
            let ip_address = extract_ip_address(request.headers());
            let user_agent = extract_user_agent(request.headers());

            let event = match &e {
                AuthError::AuthUnavailable(reason) => AuditEvent::AuthUnavailable {
                    operation: "authorize".to_string(),
                    reason: reason.clone(),
                },
                _ => AuditEvent::InvalidToken {
                    ip_address,
                    user_agent,
                    reason: e.reason().to_string(),
                },
            };
            audit_log(&event);

            Err(e)
        }
    }
}

/// Pull the token out of a strict `Authorization: Bearer <token>` header
///
/// The scheme must be exactly `Bearer` followed by one space and a
/// non-empty token without whitespace. Any other shape is `MissingToken`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthError::MissingToken);
    }

    Ok(token.to_string())
}
