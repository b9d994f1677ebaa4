/// Authentication Routes
///
/// Login, access-token refresh, and refresh-token revocation.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::users::UserResponse;
use crate::auth::AuthService;
use crate::error::AppError;
use crate::middleware::BearerToken;

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: the user plus a fresh token pair
#[derive(Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

/// Refresh response
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/login
///
/// # Errors
/// - 400: Missing email or password
/// - 401: Invalid credentials
///
/// # Security Notes
/// - Unknown email and wrong password produce the same response
pub async fn login(
    form: web::Json<LoginRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let session = service.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(session.user),
        token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// POST /api/refresh
///
/// Takes the refresh token as the bearer credential and returns a new access
/// token. The refresh token stays valid.
///
/// # Errors
/// - 401: Missing, unknown, expired, or revoked refresh token
pub async fn refresh(
    token: BearerToken,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let access_token = service.refresh(token.as_str()).await?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        token: access_token,
    }))
}

/// POST /api/revoke
///
/// Revoking an already-revoked token succeeds.
pub async fn revoke(
    token: BearerToken,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    service.revoke(token.as_str()).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::JwtSettings;
    use crate::store::InMemoryStore;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Captures the `request_id` of every warn-or-worse event.
    #[derive(Clone, Default)]
    struct WarnEvents(Arc<Mutex<Vec<Option<String>>>>);

    struct RequestIdVisitor(Option<String>);

    impl Visit for RequestIdVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "request_id" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "request_id" {
                self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarnEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() <= tracing::Level::WARN {
                let mut visitor = RequestIdVisitor(None);
                event.record(&mut visitor);
                self.0.lock().unwrap().push(visitor.0);
            }
        }
    }

    #[actix_web::test]
    async fn test_failed_login_is_logged_once_with_response_id() {
        let events = WarnEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let service = web::Data::new(AuthService::new(
            Arc::new(InMemoryStore::new()),
            JwtSettings::new("test-secret-key-at-least-32-characters-long"),
        ));
        let app = test::init_service(
            App::new()
                .app_data(service)
                .route("/api/login", web::post().to(login)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(serde_json::json!({ "email": "nobody@b.com", "password": "secret123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);

        let body: Value = test::read_body_json(resp).await;
        let error_id = body["error_id"].as_str().unwrap().to_string();

        let logged = events.0.lock().unwrap().clone();
        assert_eq!(logged, vec![Some(error_id)]);
    }
}
