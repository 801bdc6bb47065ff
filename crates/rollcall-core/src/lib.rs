//! Rollcall Core - shared configuration and collaborator contracts
//!
//! This crate defines what the authentication service needs from the rest
//! of the attendance system:
//! - Configuration management
//! - Credential lookup (PostgreSQL and in-memory stores)
//! - Common error types

pub mod config;
pub mod credentials;

pub use config::{
    AppConfig, AuthConfig, BootstrapUser, CacheBackend, CacheConfig, ConfigError,
    DatabaseConfig, LoggingConfig, ServerConfig,
};
pub use credentials::{Credential, CredentialStore, InMemoryCredentialStore, PgCredentialStore};

use thiserror::Error;

/// Core error types for Rollcall operations
#[derive(Error, Debug)]
pub enum RollcallError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type Result<T> = std::result::Result<T, RollcallError>;
