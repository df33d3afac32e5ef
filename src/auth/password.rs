use actix_web::web;
use bcrypt::{hash, verify};

use crate::error::AppError;

/// bcrypt-based password hashing. The random salt is embedded in each hash.
///
/// Neither method logs its inputs.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        hash(password, self.cost)
            .map_err(|e| AppError::Hashing(format!("failed to hash password: {}", e)))
    }

    /// `Ok(false)` on mismatch. Only a malformed stored hash is an error.
    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, AppError> {
        verify(password, hashed_password)
            .map_err(|e| AppError::Hashing(format!("failed to verify password: {}", e)))
    }

    /// Runs `hash` on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        web::block(move || hasher.hash(&password)).await?
    }

    /// Runs `verify` on the blocking thread pool.
    pub async fn verify_blocking(
        &self,
        password: String,
        hashed_password: String,
    ) -> Result<bool, AppError> {
        let hasher = *self;
        web::block(move || hasher.verify(&password, &hashed_password)).await?
    }
}
