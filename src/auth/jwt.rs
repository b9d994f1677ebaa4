/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed and self-contained: validation needs the
/// token and the shared secret, never the store.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Access token failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Unparseable, wrong algorithm, wrong issuer, or bad subject
    Malformed,
    InvalidSignature,
    Expired,
    /// Encoding failed while issuing
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "malformed token"),
            TokenError::InvalidSignature => write!(f, "invalid token signature"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::Signing(msg) => write!(f, "token signing failed: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issue an access token for `user_id`, valid for `ttl`
///
/// # Errors
/// Returns `Signing` if encoding fails
pub fn issue_access_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, TokenError> {
    let claims = Claims::new(user_id, Utc::now(), ttl);

    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Validate an access token and return its subject
///
/// Signature is checked before expiry, so a forged expired token reports
/// `InvalidSignature`.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, TokenError> {
    decode_claims(token, secret)?.user_id()
}

/// Validate an access token and return its claims
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, TokenError> {
    // Reject anything not signed with our algorithm before touching the key.
    let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
    if header.alg != ALGORITHM {
        tracing::warn!(alg = ?header.alg, "Rejected token with unexpected algorithm");
        return Err(TokenError::Malformed);
    }

    let mut validation = Validation::new(ALGORITHM);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    // Expiry is checked below with no leeway.
    validation.validate_exp = false;
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    })?;

    if claims.is_expired_at(Utc::now()) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    #[test]
    fn test_issue_and_validate_token() {
        let user_id = Uuid::new_v4();

        let token = issue_access_token(user_id, SECRET, Duration::hours(1))
            .expect("Failed to issue token");
        let subject = validate_access_token(&token, SECRET).expect("Failed to validate token");

        assert_eq!(subject, user_id);
    }

    #[test]
    fn test_claims_extraction() {
        let user_id = Uuid::new_v4();
        let token = issue_access_token(user_id, SECRET, Duration::hours(1)).unwrap();

        let claims = decode_claims(&token, SECRET).unwrap();
        assert_eq!(claims.iss, "chirpy");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token() {
        let user_id = Uuid::new_v4();

        let zero = issue_access_token(user_id, SECRET, Duration::zero()).unwrap();
        assert_eq!(validate_access_token(&zero, SECRET), Err(TokenError::Expired));

        let past = issue_access_token(user_id, SECRET, Duration::hours(-1)).unwrap();
        assert_eq!(validate_access_token(&past, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        assert_eq!(
            validate_access_token(&token, "a-completely-different-secret"),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(-1)).unwrap();

        assert_eq!(
            validate_access_token(&token, "another-secret"),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_spliced_payload() {
        let mine = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let theirs = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        let mine: Vec<&str> = mine.split('.').collect();
        let theirs: Vec<&str> = theirs.split('.').collect();
        let forged = format!("{}.{}.{}", mine[0], theirs[1], mine[2]);

        assert_eq!(
            validate_access_token(&forged, SECRET),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_invalid_tokens() {
        for token in ["", "invalid", "invalid.token.here", "a.b", "...."] {
            assert_eq!(
                validate_access_token(token, SECRET),
                Err(TokenError::Malformed),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_algorithm_substitution_rejected() {
        let claims = Claims::new(Uuid::new_v4(), Utc::now(), Duration::hours(1));
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(validate_access_token(&hs512, SECRET), Err(TokenError::Malformed));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        // {"alg":"none","typ":"JWT"}
        let unsigned = format!("eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.{}.", payload);

        assert_eq!(validate_access_token(&unsigned, SECRET), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), Utc::now(), Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Err(TokenError::Malformed));
    }
}
