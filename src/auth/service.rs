//! Authentication service
//!
//! Composes the password hasher, access-token issuer and refresh-token
//! manager into the login, refresh, revoke, and authenticate flows. Every
//! authentication failure leaves here as one of two outward signals
//! (`InvalidCredentials` or `Unauthorized`); the precise cause rides along
//! inside for logs and tests only.

use std::sync::Arc;

use uuid::Uuid;

use super::jwt::{issue_access_token, validate_access_token};
use super::password::{burn_dummy_verification, hash_password, verify_password, PasswordError};
use super::refresh_token::{fingerprint, RefreshTokenError, RefreshTokenManager};
use crate::configuration::JwtSettings;
use crate::error::{AppError, CredentialFailure, UnauthorizedReason, ValidationError};
use crate::store::{AuthStore, StoreError, User};
use crate::validators::{is_valid_email, is_valid_password, validate_login_fields};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
    refresh_tokens: RefreshTokenManager,
    jwt: JwtSettings,
}

impl AuthService {
    pub fn new(store: Arc<dyn AuthStore>, jwt: JwtSettings) -> Self {
        let refresh_tokens = RefreshTokenManager::new(store.clone(), jwt.refresh_token_ttl());
        Self {
            store,
            refresh_tokens,
            jwt,
        }
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    /// Create an account with a password credential
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        let hashed = hash_off_thread(password).await?;
        let user = self.store.create_user_with_credential(&email, &hashed).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Replace the email and password of the authenticated user's own account
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        let hashed = hash_off_thread(password).await?;
        let user = self
            .store
            .update_user_credential(user_id, &email, &hashed)
            .await?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user)
    }

    /// Verify credentials and open a new session
    ///
    /// Unknown email, wrong password, missing credential, and malformed hash
    /// all fail with the same `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AppError> {
        validate_login_fields(email, password)?;

        let user = match self.store.get_user_by_email(email.trim()).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                let password = password.to_string();
                run_blocking(move || burn_dummy_verification(&password)).await?;
                return Err(AppError::invalid_credentials(CredentialFailure::UnknownEmail));
            }
            Err(e) => return Err(e.into()),
        };

        let password = password.to_string();
        let credential = user.hashed_password.clone();
        run_blocking(move || verify_password(&password, credential.as_deref()))
            .await?
            .map_err(|e| AppError::invalid_credentials(CredentialFailure::Password(e)))?;

        let access_token = self.issue_access_token(user.id)?;
        let refresh_token = self
            .refresh_tokens
            .create(user.id)
            .await
            .map_err(collapse_refresh_error)?;

        tracing::info!(
            user_id = %user.id,
            refresh_token = %fingerprint(&refresh_token),
            "User logged in"
        );

        Ok(LoginSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Mint a fresh access token from an active refresh token
    ///
    /// The refresh token itself is left unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let user_id = self
            .refresh_tokens
            .lookup(refresh_token)
            .await
            .map_err(collapse_refresh_error)?;

        let access_token = self.issue_access_token(user_id)?;
        tracing::debug!(user_id = %user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke a refresh token
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        self.refresh_tokens
            .revoke(refresh_token)
            .await
            .map_err(collapse_refresh_error)
    }

    /// Resolve an access token to its subject. Never touches the store.
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, AppError> {
        validate_access_token(access_token, &self.jwt.secret)
            .map_err(|e| AppError::unauthorized(UnauthorizedReason::AccessToken(e)))
    }

    fn issue_access_token(&self, user_id: Uuid) -> Result<String, AppError> {
        issue_access_token(user_id, &self.jwt.secret, self.jwt.access_token_ttl())
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

fn collapse_refresh_error(err: RefreshTokenError) -> AppError {
    match err {
        RefreshTokenError::Store(e) => e.into(),
        other => AppError::unauthorized(UnauthorizedReason::RefreshToken(other)),
    }
}

async fn hash_off_thread(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    run_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| match e {
            PasswordError::EmptyPassword => {
                AppError::Validation(ValidationError::EmptyField("password".to_string()))
            }
            other => AppError::Internal(other.to_string()),
        })
}

/// Argon2 work runs on the blocking pool so it never stalls request handling.
async fn run_blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))
}
