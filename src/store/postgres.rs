use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuthStore, Chirp, RefreshTokenRecord, StoreError, User};

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx_error(err: sqlx::Error, entity: &str) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound(entity.to_string()),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::UniqueViolation(db_err.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(err.to_string())
        }
        other => StoreError::Database(other.to_string()),
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn create_user_with_credential(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        let now = Utc::now();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "user"))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "user"))
    }

    async fn update_user_credential(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "user"))
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $3, $4, NULL)
            RETURNING token, user_id, created_at, updated_at, expires_at, revoked_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(Utc::now())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "refresh token"))
    }

    async fn get_refresh_token(&self, token: &str) -> Result<RefreshTokenRecord, StoreError> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "refresh token"))
    }

    async fn revoke_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $2),
                updated_at = CASE WHEN revoked_at IS NULL THEN $2 ELSE updated_at END
            WHERE token = $1
            "#,
        )
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "refresh token"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("refresh token".to_string()));
        }
        Ok(())
    }

    async fn create_chirp(&self, user_id: Uuid, body: &str) -> Result<Chirp, StoreError> {
        let now = Utc::now();
        sqlx::query_as::<_, Chirp>(
            r#"
            INSERT INTO chirps (id, body, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, body, user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(body)
        .bind(user_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "chirp"))
    }

    async fn get_chirp(&self, chirp_id: Uuid) -> Result<Chirp, StoreError> {
        sqlx::query_as::<_, Chirp>(
            "SELECT id, body, user_id, created_at, updated_at FROM chirps WHERE id = $1",
        )
        .bind(chirp_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "chirp"))
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "chirp"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("chirp".to_string()));
        }
        Ok(())
    }
}
