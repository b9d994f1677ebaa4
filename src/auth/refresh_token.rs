/// Refresh Token Management
///
/// Refresh tokens are opaque, database-backed, and long-lived:
/// - 64 random alphanumeric characters from a CSPRNG
/// - Active until `expires_at` passes or `revoked_at` is set
/// - Never deleted, only marked revoked
/// - Not rotated on use: refreshing leaves the token untouched

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::store::{AuthStore, StoreError};

pub const REFRESH_TOKEN_LENGTH: usize = 64;
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// Lifecycle state. `Expired` and `Revoked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Expired,
    Revoked,
}

/// Refresh token failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTokenError {
    NotFound,
    Expired,
    Revoked,
    Store(StoreError),
}

impl fmt::Display for RefreshTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTokenError::NotFound => write!(f, "refresh token not found"),
            RefreshTokenError::Expired => write!(f, "refresh token has expired"),
            RefreshTokenError::Revoked => write!(f, "refresh token has been revoked"),
            RefreshTokenError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RefreshTokenError {}

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Short SHA-256 fingerprint for log lines. Raw tokens are never logged.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// Creates, resolves, and revokes refresh tokens against the store
#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn AuthStore>,
    ttl: Duration,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn AuthStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint and persist a token for `user_id`
    pub async fn create(&self, user_id: Uuid) -> Result<String, RefreshTokenError> {
        let token = generate_refresh_token();
        let expires_at = Utc::now() + self.ttl;

        self.store
            .create_refresh_token(&token, user_id, expires_at)
            .await
            .map_err(RefreshTokenError::Store)?;

        tracing::debug!(
            user_id = %user_id,
            token = %fingerprint(&token),
            expires_at = %expires_at,
            "Refresh token created"
        );
        Ok(token)
    }

    /// Resolve an active token to its owner
    ///
    /// # Errors
    /// `NotFound`, `Expired`, or `Revoked`; store failures as `Store`
    pub async fn lookup(&self, token: &str) -> Result<Uuid, RefreshTokenError> {
        let result = self
            .store
            .get_active_refresh_token_owner(token, Utc::now())
            .await;

        if let Err(e) = &result {
            tracing::info!(token = %fingerprint(token), reason = %e, "Refresh token rejected");
        }
        result
    }

    /// Mark a token revoked. Revoking an already-revoked token succeeds.
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshTokenError> {
        self.store
            .revoke_refresh_token(token, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => RefreshTokenError::NotFound,
                other => RefreshTokenError::Store(other),
            })?;

        tracing::info!(token = %fingerprint(token), "Refresh token revoked");
        Ok(())
    }
}
