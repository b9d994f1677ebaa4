/// Persistence contract consumed by the authentication core
///
/// `PgStore` is the production implementation; `InMemoryStore` backs the
/// test suites and local experiments.

mod memory;
mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{Owned, RefreshTokenError, RefreshTokenState};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Store failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Row absent; carries the entity name
    NotFound(String),
    UniqueViolation(String),
    Connection(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(what) => write!(f, "{} not found", what),
            StoreError::UniqueViolation(msg) => write!(f, "unique constraint violated: {}", msg),
            StoreError::Connection(msg) => write!(f, "store connection error: {}", msg),
            StoreError::Database(msg) => write!(f, "store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Registered account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// `None` when no password has been configured for the account
    pub hashed_password: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted refresh token row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Revocation wins over expiry when both apply.
    pub fn state(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }
}

/// A short post owned by a user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Chirp {
    pub id: Uuid,
    pub body: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for Chirp {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user_with_credential(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn update_user_credential(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError>;

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError>;

    async fn get_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError>;

    /// Owner of `token` if it is active at `now`.
    async fn get_active_refresh_token_owner(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, RefreshTokenError> {
        let record = self.get_refresh_token(token).await.map_err(|e| match e {
            StoreError::NotFound(_) => RefreshTokenError::NotFound,
            other => RefreshTokenError::Store(other),
        })?;

        match record.state(now) {
            RefreshTokenState::Active => Ok(record.user_id),
            RefreshTokenState::Expired => Err(RefreshTokenError::Expired),
            RefreshTokenState::Revoked => Err(RefreshTokenError::Revoked),
        }
    }

    /// Sets `revoked_at` if unset. Revoking twice keeps the first timestamp.
    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<(), StoreError>;

    async fn create_chirp(&self, user_id: Uuid, body: &str) -> Result<Chirp, StoreError>;

    async fn get_chirp(&self, chirp_id: Uuid) -> Result<Chirp, StoreError>;

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), StoreError>;
}
