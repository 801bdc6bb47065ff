//! Credential lookup
//!
//! The user table is owned elsewhere; the auth core only needs to look a
//! credential up by username. Lookups return `Option` so "no such user" is an
//! explicit signal rather than a zero-valued record.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::collections::HashMap;

use crate::config::BootstrapUser;
use crate::{Result, RollcallError};

/// Stored login secret for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque subject identifier placed in issued tokens
    pub subject_id: String,
    pub username: String,
    /// bcrypt digest of the password
    pub password_hash: String,
    /// False when the account is disabled, locked or expired
    pub enabled: bool,
}

impl Credential {
    pub fn new(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Read-only access to the user-credential store
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find the credential for `username`, `Ok(None)` when no such user exists
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>>;
}

/// PostgreSQL credential store over the `m_user` table
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new credential store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| RollcallError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    user_name: String,
    password: String,
    account_expired: bool,
    account_locked: bool,
    credentials_expired: bool,
    enabled: bool,
}

impl From<UserRow> for Credential {
    fn from(row: UserRow) -> Self {
        Credential {
            subject_id: row.id.to_string(),
            username: row.user_name,
            password_hash: row.password,
            enabled: row.enabled
                && !row.account_locked
                && !row.account_expired
                && !row.credentials_expired,
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, user_name, password, account_expired, account_locked,
                   credentials_expired, enabled
            FROM m_user
            WHERE user_name = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RollcallError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        Ok(row.map(Credential::from))
    }
}

/// Fixed set of credentials held in memory
///
/// Used when no database is configured and as the test double.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, Credential>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.users.insert(credential.username.clone(), credential);
        self
    }

    pub fn from_bootstrap(users: &[BootstrapUser]) -> Self {
        users.iter().fold(Self::new(), |store, user| {
            store.with_credential(Credential::new(
                &user.id,
                &user.username,
                &user.password_hash,
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>> {
        Ok(self.users.get(username).cloned())
    }
}
