/// Chirp Routes
///
/// Chirps are the owned resource: creation binds the owner to the
/// authenticated subject, deletion is admitted for the owner only.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{authorize_resource, AuthService};
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::validators::is_valid_chirp;

/// New chirp. Any owner field in the payload is ignored.
#[derive(Deserialize)]
pub struct CreateChirpRequest {
    pub body: String,
}

/// POST /api/chirps
///
/// # Errors
/// - 400: Empty body or longer than 140 characters
/// - 401: Missing or invalid access token
pub async fn create_chirp(
    user: AuthenticatedUser,
    form: web::Json<CreateChirpRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    is_valid_chirp(&form.body)?;

    let chirp = service
        .store()
        .create_chirp(user.user_id, &form.body)
        .await?;

    tracing::info!(chirp_id = %chirp.id, user_id = %user.user_id, "Chirp created");

    Ok(HttpResponse::Created().json(chirp))
}

/// GET /api/chirps/{chirp_id}
pub async fn get_chirp(
    path: web::Path<Uuid>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let chirp = service.store().get_chirp(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(chirp))
}

/// DELETE /api/chirps/{chirp_id}
///
/// # Errors
/// - 401: Missing or invalid access token
/// - 403: Caller is not the chirp's owner
/// - 404: No such chirp
pub async fn delete_chirp(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let chirp_id = path.into_inner();

    let chirp = service.store().get_chirp(chirp_id).await?;
    authorize_resource(user.user_id, &chirp)?;

    service.store().delete_chirp(chirp_id).await?;

    tracing::info!(chirp_id = %chirp_id, user_id = %user.user_id, "Chirp deleted");

    Ok(HttpResponse::NoContent().finish())
}
