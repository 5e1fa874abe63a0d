use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use crate::error::AppError;

/// One-way password hashing used before users are persisted.
pub trait CredentialService: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError>;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Credentials;

impl CredentialService for Argon2Credentials {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        hash_password(plaintext)
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError> {
        verify_password(plaintext, hash)
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);

    Ok(result.is_ok())
}
