use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};

use crate::auth::AuthService;
use crate::configuration::JwtSettings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::routes::{
    create_chirp, create_user, delete_chirp, get_chirp, health_check, login, refresh, revoke,
    update_user,
};
use crate::store::AuthStore;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn AuthStore>,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let auth_service = web::Data::new(AuthService::new(store, jwt_config));

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(auth_service.clone())
            .app_data(json_config())

            .service(
                web::scope("/api")
                    .route("/healthz", web::get().to(health_check))
                    // Public: create account. Authenticated: update own account.
                    .route("/users", web::post().to(create_user))
                    .route("/users", web::put().to(update_user))
                    .route("/login", web::post().to(login))
                    // Refresh token presented as the bearer credential
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    .route("/chirps", web::post().to(create_chirp))
                    .route("/chirps/{chirp_id}", web::get().to(get_chirp))
                    .route("/chirps/{chirp_id}", web::delete().to(delete_chirp)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Malformed JSON bodies surface as ordinary validation errors
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "Rejected request body");
        AppError::Validation(ValidationError::InvalidFormat("request body".to_string())).into()
    })
}
