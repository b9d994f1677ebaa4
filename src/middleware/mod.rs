/// Middleware module
///
/// Request extractors for bearer authentication.

mod auth;

pub use auth::{bearer_token, AuthenticatedUser, BearerToken};
