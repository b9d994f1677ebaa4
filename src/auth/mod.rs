/// Authentication module
///
/// Password hashing, access-token issuance and validation, refresh-token
/// lifecycle, and ownership checks. `AuthService` ties them together.

mod authorization;
mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use authorization::{authorize, authorize_resource, AuthorizationError, Owned};
pub use claims::{Claims, ISSUER};
pub use jwt::{issue_access_token, validate_access_token, TokenError};
pub use password::{hash_password, verify_password, PasswordError};
pub use refresh_token::{
    fingerprint, generate_refresh_token, RefreshTokenError, RefreshTokenManager,
    RefreshTokenState, DEFAULT_REFRESH_TOKEN_TTL_DAYS, REFRESH_TOKEN_LENGTH,
};
pub use service::{AuthService, LoginSession};
