use std::fmt;

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use service_core::error::AppError;
use service_core::validation::FieldValidator;

pub const MIN_PASSWORD_BYTES: usize = 8;
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn validate_password_plaintext(v: &mut FieldValidator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= MIN_PASSWORD_BYTES,
        "password",
        format!("must be at least {} bytes long", MIN_PASSWORD_BYTES),
    );
    v.check(
        password.len() <= MAX_PASSWORD_BYTES,
        "password",
        format!("must not be more than {} bytes long", MAX_PASSWORD_BYTES),
    );
}

/// Argon2id hash of a user's password in PHC string form.
///
/// Stored as-is in `users.password_hash`; the plaintext never leaves [`Credential::set`].
#[derive(Clone, PartialEq, Eq, sqlx::Type)]
#[sqlx(transparent)]
pub struct Credential(String);

impl Credential {
    /// Validate the plaintext and hash it with a fresh salt.
    pub fn set(plaintext: &str) -> Result<Self, AppError> {
        let mut v = FieldValidator::new();
        validate_password_plaintext(&mut v, plaintext);
        v.into_result()?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {}", e)))?
            .to_string();

        Ok(Self(hash))
    }

    /// `Ok(false)` on a wrong password; `Err` only when the stored hash is unusable.
    pub fn matches(&self, plaintext: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(&self.0)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid password hash format: {}", e)))?;

        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "password verification failed: {}",
                e
            ))),
        }
    }

    pub fn from_hash(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}
