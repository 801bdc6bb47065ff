//! Authentication and authorization module
//!
//! Bearer-token authentication with server-side revocation:
//! - Password hashing with bcrypt
//! - Token issuance and validation (HS256 JWT)
//! - Revocation store (in-process or Redis) with self-expiring entries
//! - Session manager orchestrating login, logout and authorization
//! - Middleware enforcing authorization on protected routes

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod revocation;
pub mod service;

pub use error::AuthError;
pub use jwt::{Claims, IssuedToken, TokenCodec, TokenError, VerifiedToken};
pub use middleware::{auth_middleware, extract_bearer_token};
pub use models::{
    AuthenticatedIdentity, BearerToken, LoginRequest, LoginResponse, LogoutOutcome,
    LogoutResponse,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use revocation::{MemoryRevocationStore, RedisRevocationStore, RevocationStore, StoreError};
pub use service::AuthSessionManager;
