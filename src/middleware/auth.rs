/// Bearer authentication extractors
///
/// Handlers opt into authentication by taking one of these as an argument.
/// `BearerToken` yields the raw token (refresh and revoke take refresh
/// tokens this way); `AuthenticatedUser` validates an access token and
/// yields its subject.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::{web, FromRequest, HttpRequest};
use uuid::Uuid;

use crate::auth::AuthService;
use crate::error::{AppError, UnauthorizedReason};

const BEARER_PREFIX: &str = "Bearer ";

/// Raw token from `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for BearerToken {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(bearer_token(req.headers()).map(BearerToken))
    }
}

/// Subject of a valid access token
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(req.headers())?;

    let service = req
        .app_data::<web::Data<AuthService>>()
        .ok_or_else(|| AppError::Internal("auth service not configured".to_string()))?;

    let user_id = service.authenticate(&token)?;
    tracing::debug!(user_id = %user_id, "Access token validated");

    Ok(AuthenticatedUser { user_id })
}

/// Extract the token from an `Authorization: Bearer <token>` header
///
/// Exactly one space separates the scheme from the token; any whitespace
/// inside the token is rejected.
pub fn bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
        .ok_or_else(|| AppError::unauthorized(UnauthorizedReason::MissingToken))?;

    Ok(token.to_string())
}
