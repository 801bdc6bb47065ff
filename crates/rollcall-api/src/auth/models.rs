//! Authentication request, response and context types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity resolved from a valid, unrevoked token
///
/// Inserted into request extensions by the auth middleware; handlers take
/// it with `Extension<AuthenticatedIdentity>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    /// Subject identifier from the token
    pub subject: String,
    /// Token ID, the revocation key
    pub token_id: String,
    /// Expiry as Unix epoch seconds
    pub expires_at: u64,
}

/// Raw bearer token of the current request, kept for logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
}

/// Logout response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// What a logout call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// A revocation entry was written for the remaining lifetime
    Revoked { token_id: String, subject: String },
    /// The token failed signature or expiry checks; nothing to revoke
    AlreadyInvalid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_uses_camel_case() {
        let response = LoginResponse {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["accessToken"], "abc");
        assert_eq!(json["tokenType"], "Bearer");
        assert_eq!(json["expiresIn"], 3600);
    }

    #[test]
    fn test_login_request_deserialization() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username":"admin", "password":"admin1234"}"#).unwrap();
        assert_eq!(request.username, "admin");
        assert_eq!(request.password, "admin1234");
    }
}
