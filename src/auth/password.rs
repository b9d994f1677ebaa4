/// Password Hashing and Verification
///
/// Argon2id with a fresh random salt per hash. Hashes are PHC strings
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$digest`) so the parameters travel
/// with the digest.

use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use lazy_static::lazy_static;

lazy_static! {
    // Verified against when there is nothing real to verify, so that failure
    // paths cost the same as a genuine mismatch.
    static ref DUMMY_HASH: Option<String> = Argon2::default()
        .hash_password(b"dummy-password", &SaltString::generate(&mut OsRng))
        .map(|h| h.to_string())
        .ok();
}

/// Password hashing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    EmptyPassword,
    /// The account has no password configured
    CredentialNotSet,
    Mismatch,
    MalformedHash,
    /// Argon2 failed while hashing
    Hashing(String),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::EmptyPassword => write!(f, "password cannot be empty"),
            PasswordError::CredentialNotSet => write!(f, "user has not set a password"),
            PasswordError::Mismatch => write!(f, "password does not match"),
            PasswordError::MalformedHash => write!(f, "stored password hash is malformed"),
            PasswordError::Hashing(msg) => write!(f, "password hashing failed: {}", msg),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Hash a password with Argon2id
///
/// CPU and memory heavy; async callers should run it on a blocking worker.
///
/// # Errors
/// - `EmptyPassword` if `password` is empty
/// - `Hashing` if argon2 rejects its inputs
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyPassword);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a stored credential
///
/// `credential` is `None` when the account has no password configured.
/// Digest comparison is constant-time inside `argon2`.
pub fn verify_password(password: &str, credential: Option<&str>) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::EmptyPassword);
    }

    let stored = match credential {
        Some(stored) => stored,
        None => {
            burn_dummy_verification(password);
            return Err(PasswordError::CredentialNotSet);
        }
    };

    // A PHC string without salt or digest parses fine but verifies without
    // running argon2 at all.
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) if parsed.salt.is_some() && parsed.hash.is_some() => parsed,
        _ => return Err(malformed_hash(password)),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(()),
        Err(password_hash::Error::Password) => Err(PasswordError::Mismatch),
        Err(_) => Err(malformed_hash(password)),
    }
}

fn malformed_hash(password: &str) -> PasswordError {
    burn_dummy_verification(password);
    PasswordError::MalformedHash
}

/// Spend one verification's worth of work and discard the result.
pub fn burn_dummy_verification(password: &str) {
    if let Some(parsed) = DUMMY_HASH.as_deref().and_then(|h| PasswordHash::new(h).ok()) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}
