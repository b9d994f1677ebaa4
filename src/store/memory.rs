use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AuthStore, Chirp, RefreshTokenRecord, StoreError, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    chirps: HashMap<Uuid, Chirp>,
}

/// Process-local store with the same semantics as `PgStore`
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("in-memory store lock poisoned".to_string()))
    }

    /// Creates an account that has no password configured.
    pub fn insert_user_without_credential(&self, email: &str) -> Result<User, StoreError> {
        self.insert_user(email, None)
    }

    /// Overwrites the stored credential with arbitrary text.
    pub fn overwrite_credential(&self, user_id: Uuid, raw: Option<&str>) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound("user".to_string()))?;
        user.hashed_password = raw.map(str::to_string);
        Ok(())
    }

    /// Moves a refresh token's expiry, e.g. into the past.
    pub fn set_refresh_token_expiry(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let record = tables
            .refresh_tokens
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))?;
        record.expires_at = expires_at;
        Ok(())
    }

    pub fn refresh_tokens_for(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .refresh_tokens
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn insert_user(&self, email: &str, hashed_password: Option<&str>) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation("email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn create_user_with_credential(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        self.insert_user(email, Some(hashed_password))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let tables = self.lock()?;
        tables
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("user".to_string()))
    }

    async fn update_user_credential(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == email && u.id != user_id) {
            return Err(StoreError::UniqueViolation("email already registered".to_string()));
        }

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound("user".to_string()))?;
        user.email = email.to_string();
        user.hashed_password = Some(hashed_password.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Database(
                "refresh token references unknown user".to_string(),
            ));
        }
        if tables.refresh_tokens.contains_key(token) {
            return Err(StoreError::UniqueViolation("refresh token already exists".to_string()));
        }

        let now = Utc::now();
        let record = RefreshTokenRecord {
            token: token.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };
        tables.refresh_tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn get_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError> {
        let tables = self.lock()?;
        tables
            .refresh_tokens
            .get(token)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }

    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let record = tables
            .refresh_tokens
            .get_mut(token)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))?;
        if record.revoked_at.is_none() {
            record.revoked_at = Some(now);
            record.updated_at = now;
        }
        Ok(())
    }

    async fn create_chirp(&self, user_id: Uuid, body: &str) -> Result<Chirp, StoreError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Database("chirp references unknown user".to_string()));
        }

        let now = Utc::now();
        let chirp = Chirp {
            id: Uuid::new_v4(),
            body: body.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
        };
        tables.chirps.insert(chirp.id, chirp.clone());
        Ok(chirp)
    }

    async fn get_chirp(&self, chirp_id: Uuid) -> Result<Chirp, StoreError> {
        let tables = self.lock()?;
        tables
            .chirps
            .get(&chirp_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("chirp".to_string()))
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables
            .chirps
            .remove(&chirp_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound("chirp".to_string()))
    }
}
