/// JWT Claims structure
///
/// Registered claims only (RFC 7519): the token asserts who the subject is,
/// who issued the assertion, and the window in which it holds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::TokenError;

/// Issuer written into every access token
pub const ISSUER: &str = "chirpy";

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id`, valid from `now` for `ttl`
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let now = issued_at.timestamp();
        Self {
            sub: user_id.to_string(),
            iss: ISSUER.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `Malformed` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    /// Expired once `now` reaches `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let claims = Claims::new(user_id, now, Duration::hours(1));

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired_at(now));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let claims = Claims::new(Uuid::new_v4(), now, Duration::seconds(10));

        assert!(!claims.is_expired_at(now + Duration::seconds(9)));
        assert!(claims.is_expired_at(now + Duration::seconds(10)));
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Utc::now(), Duration::hours(1));

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(Uuid::new_v4(), Utc::now(), Duration::hours(1));
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.user_id(), Err(TokenError::Malformed));
    }
}
