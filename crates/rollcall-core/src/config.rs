//! Rollcall Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest bcrypt cost accepted by the hasher
pub const MIN_BCRYPT_COST: u32 = 4;

/// Highest bcrypt cost accepted by the hasher
pub const MAX_BCRYPT_COST: u32 = 31;

const DEV_SECRET: &str = "development-secret-key-change-in-production";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token issuance and credential verification
    pub auth: AuthConfig,

    /// Revocation cache backend
    pub cache: CacheConfig,

    /// Credential database
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Load the file named by `ROLLCALL_CONFIG` if set, then apply the environment
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("ROLLCALL_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        let config = base.with_env_override()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_var("API_PORT", port)?;
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(issuer) = std::env::var("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Ok(ttl) = std::env::var("JWT_TTL_SECS") {
            self.auth.token_ttl_secs = parse_var("JWT_TTL_SECS", ttl)?;
        }
        if let Ok(cost) = std::env::var("BCRYPT_COST") {
            self.auth.bcrypt_cost = parse_var("BCRYPT_COST", cost)?;
        }
        if let Ok(timeout) = std::env::var("AUTH_TIMEOUT_MS") {
            self.auth.operation_timeout_ms = parse_var("AUTH_TIMEOUT_MS", timeout)?;
        }

        // Revocation cache
        if let Ok(backend) = std::env::var("CACHE_BACKEND") {
            self.cache.backend = backend.parse()?;
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            self.cache.redis_url = Some(url);
        }

        // PostgreSQL
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.postgres_url = Some(url);
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            self.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(self)
    }

    /// Reject configurations the auth core cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_TTL_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::InvalidValue {
                key: "BCRYPT_COST".to_string(),
                value: self.auth.bcrypt_cost.to_string(),
            });
        }
        if self.auth.operation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "AUTH_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::MissingRequired("REDIS_URL".to_string()));
        }
        // A request makes at most two bounded auth calls in sequence; both
        // must be able to time out before the router gives up with 408.
        let request_timeout_ms = self.server.request_timeout_secs.saturating_mul(1000);
        if request_timeout_ms <= self.auth.operation_timeout_ms.saturating_mul(2) {
            return Err(ConfigError::TimeoutOrder {
                request_timeout_ms,
                operation_timeout_ms: self.auth.operation_timeout_ms,
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret, read once at startup
    pub jwt_secret: String,

    /// Token issuer identifier
    pub issuer: String,

    /// Access token lifetime in seconds
    pub token_ttl_secs: u64,

    /// bcrypt cost factor for new digests
    pub bcrypt_cost: u32,

    /// Deadline for each password hash or revocation store call
    pub operation_timeout_ms: u64,

    /// Accounts served by the in-memory credential store
    pub bootstrap_users: Vec<BootstrapUser>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_SECRET.to_string(),
            issuer: "rollcall".to_string(),
            token_ttl_secs: 3600, // 1 hour
            bcrypt_cost: 10,
            operation_timeout_ms: 3000,
            bootstrap_users: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Whether the built-in development secret is still in use
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEV_SECRET
    }
}

/// Account seeded into the in-memory credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapUser {
    /// Subject identifier placed in issued tokens
    pub id: String,
    pub username: String,
    /// bcrypt digest, never the plaintext
    pub password_hash: String,
}

/// Revocation cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Which backend records revoked tokens
    pub backend: CacheBackend,

    /// Redis connection URL (required for the redis backend)
    pub redis_url: Option<String>,

    /// Key namespace inside the shared cache
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: "rollcall".to_string(),
        }
    }
}

/// Supported revocation cache backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl std::str::FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigError::InvalidValue {
                key: "CACHE_BACKEND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory credential store is used when unset
    pub postgres_url: Option<String>,

    /// PostgreSQL connection pool size
    pub postgres_pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: None,
            postgres_pool_size: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error(
        "Request timeout ({request_timeout_ms} ms) must exceed twice the auth operation timeout ({operation_timeout_ms} ms)"
    )]
    TimeoutOrder {
        request_timeout_ms: u64,
        operation_timeout_ms: u64,
    },
}
