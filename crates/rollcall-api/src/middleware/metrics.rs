//! Request and authorization counters
//!
//! Plain atomics rendered as Prometheus text by the `/metrics` handler.

use crate::auth::AuthError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Authorization and login outcome counters
#[derive(Debug, Default)]
pub struct AuthMetrics {
    granted: AtomicU64,
    missing_token: AtomicU64,
    invalid_signature: AtomicU64,
    expired: AtomicU64,
    revoked: AtomicU64,
    unavailable: AtomicU64,
    login_success: AtomicU64,
    login_failure: AtomicU64,
}

impl AuthMetrics {
    pub fn record_authorization<T>(&self, outcome: &Result<T, AuthError>) {
        let counter = match outcome {
            Ok(_) => &self.granted,
            Err(AuthError::MissingToken) => &self.missing_token,
            Err(AuthError::InvalidSignature) => &self.invalid_signature,
            Err(AuthError::Expired) => &self.expired,
            Err(AuthError::TokenRevoked) => &self.revoked,
            Err(AuthError::AuthUnavailable(_)) => &self.unavailable,
            Err(AuthError::InvalidCredentials | AuthError::Internal(_)) => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_login(&self, success: bool) {
        let counter = if success {
            &self.login_success
        } else {
            &self.login_failure
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Decision count for one outcome label
    pub fn decisions(&self, outcome: &str) -> u64 {
        let counter = match outcome {
            "granted" => &self.granted,
            "missing_token" => &self.missing_token,
            "invalid_signature" => &self.invalid_signature,
            "expired" => &self.expired,
            "revoked" => &self.revoked,
            "unavailable" => &self.unavailable,
            _ => return 0,
        };
        counter.load(Ordering::Relaxed)
    }

    /// Append Prometheus text for these counters to `output`
    pub fn render(&self, output: &mut String) {
        output.push_str("# HELP rollcall_auth_decisions_total Authorization decisions by outcome\n");
        output.push_str("# TYPE rollcall_auth_decisions_total counter\n");
        for outcome in [
            "granted",
            "missing_token",
            "invalid_signature",
            "expired",
            "revoked",
            "unavailable",
        ] {
            let _ = writeln!(
                output,
                "rollcall_auth_decisions_total{{outcome=\"{outcome}\"}} {}",
                self.decisions(outcome)
            );
        }
        output.push('\n');

        output.push_str("# HELP rollcall_logins_total Login attempts by result\n");
        output.push_str("# TYPE rollcall_logins_total counter\n");
        let _ = writeln!(
            output,
            "rollcall_logins_total{{result=\"success\"}} {}",
            self.login_success.load(Ordering::Relaxed)
        );
        let _ = writeln!(
            output,
            "rollcall_logins_total{{result=\"failure\"}} {}",
            self.login_failure.load(Ordering::Relaxed)
        );
        output.push('\n');
    }
}

/// Count every request passing through the router
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.increment_requests();
    next.run(request).await
}
