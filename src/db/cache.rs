//! Shared TTL key-value cache.
//!
//! Holds revocation markers and verification codes. Every worker shares the
//! same table, so a value written by one request is visible to all others.

use std::time::Duration;

use sqlx::sqlite::SqlitePool;

/// Namespaced cache key. Each purpose gets its own prefix so an email
/// address can never collide with a token string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey<'a> {
    /// Revocation marker for a raw token string.
    RevokedToken(&'a str),
    /// Pending verification code for an email address.
    VerificationCode(&'a str),
}

impl CacheKey<'_> {
    pub fn render(&self) -> String {
        match self {
            CacheKey::RevokedToken(token) => format!("revoked:{}", token),
            CacheKey::VerificationCode(email) => format!("verify:{}", email.to_lowercase()),
        }
    }
}

#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl CacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a value, replacing any previous one. TTLs round up to whole seconds.
    pub async fn put(&self, key: CacheKey<'_>, value: &str, ttl: Duration) -> Result<(), sqlx::Error> {
        let ttl_secs = ttl
            .as_secs()
            .saturating_add(u64::from(ttl.subsec_nanos() > 0))
            .max(1);
        let expires_at = now_secs().saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX));

        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key.render())
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a live value. Expired entries read as absent.
    pub async fn get(&self, key: CacheKey<'_>) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?")
                .bind(key.render())
                .bind(now_secs())
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn contains(&self, key: CacheKey<'_>) -> Result<bool, sqlx::Error> {
        Ok(self.get(key).await?.is_some())
    }

    pub async fn delete(&self, key: CacheKey<'_>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key.render())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the entry only if it is live and holds exactly `value`.
    /// Two callers racing on the same value cannot both succeed.
    pub async fn delete_if_matches(&self, key: CacheKey<'_>, value: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM cache_entries WHERE key = ? AND value = ? AND expires_at > ?")
                .bind(key.render())
                .bind(value)
                .bind(now_secs())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(now_secs())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
