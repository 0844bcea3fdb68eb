//! Denylist of tokens invalidated before their natural expiry.

use std::time::Duration;

use crate::db::{CacheKey, CacheStore};
use crate::jwt::unix_now;

#[derive(Clone)]
pub struct RevocationList {
    cache: CacheStore,
}

impl RevocationList {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    /// Reject `token` until `expires_at` (its `exp` claim). The marker lives
    /// at least one second, even for a token that is about to expire.
    pub async fn revoke(&self, token: &str, expires_at: u64) -> Result<(), sqlx::Error> {
        // Clock failure keeps the marker for the token's whole lifetime
        let now = unix_now().unwrap_or(0);
        let ttl = Duration::from_secs(expires_at.saturating_sub(now).max(1));
        self.cache.put(CacheKey::RevokedToken(token), "1", ttl).await
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, sqlx::Error> {
        self.cache.contains(CacheKey::RevokedToken(token)).await
    }
}
