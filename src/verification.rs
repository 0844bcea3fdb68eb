//! One-time email verification codes.

use std::time::Duration;

use rand::Rng;

use crate::db::{CacheKey, CacheStore};

/// How long an issued code stays valid.
pub const CODE_TTL: Duration = Duration::from_secs(180);

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("No verification code was issued for this email, or it has expired")]
    NoCode,
    #[error("Verification code does not match")]
    Mismatch,
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Uniform six digit code, zero padded.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

#[derive(Clone)]
pub struct VerificationCodes {
    cache: CacheStore,
}

impl VerificationCodes {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    /// Issue a fresh code for the email, replacing any pending one.
    pub async fn issue(&self, email: &str) -> Result<String, VerificationError> {
        let code = generate_code();
        self.cache
            .put(CacheKey::VerificationCode(email), &code, CODE_TTL)
            .await?;
        Ok(code)
    }

    /// Check a submitted code and consume it on match.
    pub async fn verify(&self, email: &str, code: &str) -> Result<(), VerificationError> {
        let key = CacheKey::VerificationCode(email);

        if self.cache.delete_if_matches(key, code).await? {
            return Ok(());
        }

        match self.cache.get(key).await? {
            Some(_) => Err(VerificationError::Mismatch),
            None => Err(VerificationError::NoCode),
        }
    }
}
