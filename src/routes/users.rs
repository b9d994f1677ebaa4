/// User Routes
///
/// Account creation and self-service credential updates.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::store::User;

/// Email and password pair for create and update
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user. Never carries the stored credential.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// POST /api/users
///
/// # Errors
/// - 400: Invalid email or empty password
/// - 409: Email already registered
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user = service.register(&form.email, &form.password).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// PUT /api/users
///
/// Updates the caller's own email and password. The target account is
/// always the token subject.
pub async fn update_user(
    user: AuthenticatedUser,
    form: web::Json<CredentialsRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let updated = service
        .update_credentials(user.user_id, &form.email, &form.password)
        .await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}
