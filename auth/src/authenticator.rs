use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::jwt::IssuedToken;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;
use crate::password::PasswordError;
use crate::password::PasswordHasher;

/// Plaintext hashed once at construction so that unknown users cost the same
/// verification work as known ones.
const DUMMY_PASSWORD: &str = "dummy-password-for-unknown-principals";

/// Authentication coordinator combining password verification and JWT generation.
///
/// Provides high-level authentication operations by coordinating
/// password hashing and JWT token handling. Holds the signing secret and the
/// token time-to-live, both fixed at construction.
pub struct Authenticator {
    password_hasher: PasswordHasher,
    jwt_handler: JwtHandler,
    token_ttl: Duration,
    dummy_hash: String,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
}

impl Authenticator {
    /// Create a new authenticator with the default password hasher.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing, at least 32 bytes
    /// * `token_ttl` - Lifetime of issued tokens
    ///
    /// # Errors
    /// * `JwtError` - Secret is too short
    /// * `PasswordError` - Hasher could not be initialised
    pub fn new(jwt_secret: &[u8], token_ttl: Duration) -> Result<Self, AuthenticationError> {
        Self::with_hasher(jwt_secret, token_ttl, PasswordHasher::new())
    }

    /// Create a new authenticator with an explicit password hasher.
    pub fn with_hasher(
        jwt_secret: &[u8],
        token_ttl: Duration,
        password_hasher: PasswordHasher,
    ) -> Result<Self, AuthenticationError> {
        let jwt_handler = JwtHandler::new(jwt_secret)?;
        let dummy_hash = password_hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            password_hasher,
            jwt_handler,
            token_ttl,
            dummy_hash,
        })
    }

    /// Lifetime applied to every issued token.
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Hash a password for storage.
    ///
    /// # Errors
    /// * `PasswordError` - Hashing operation failed
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Check a password against a stored hash.
    ///
    /// When there is no stored hash (unknown or unusable account) the password
    /// is checked against an internal dummy hash and the result is always
    /// false, so both paths do the same amount of work.
    pub fn verify_password(&self, password: &str, stored_hash: Option<&str>) -> bool {
        match stored_hash {
            Some(hash) => self.password_hasher.verify(password, hash),
            None => {
                let _ = self.password_hasher.verify(password, &self.dummy_hash);
                false
            }
        }
    }

    /// Verify credentials and issue a token for `subject`.
    ///
    /// # Arguments
    /// * `subject` - Identity the token is issued for
    /// * `password` - Plaintext password to verify
    /// * `stored_hash` - Stored password hash, `None` if there is no usable account
    /// * `now` - Issue instant
    ///
    /// # Errors
    /// * `InvalidCredentials` - No usable account or password does not match
    /// * `JwtError` - Token generation failed
    pub fn authenticate(
        &self,
        subject: &str,
        password: &str,
        stored_hash: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthenticationError> {
        if !self.verify_password(password, stored_hash) {
            return Err(AuthenticationError::InvalidCredentials);
        }

        Ok(self.issue_token(subject, now)?)
    }

    /// Issue a token without password verification.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_token(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, JwtError> {
        self.jwt_handler.issue(subject, now, self.token_ttl)
    }

    /// Validate a token at `now` and return its subject.
    ///
    /// # Errors
    /// * `JwtError` - Token is malformed, forged, or expired
    pub fn validate_token(&self, token: &str, now: DateTime<Utc>) -> Result<String, JwtError> {
        self.jwt_handler.verify(token, now)
    }
}
