use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;

/// Add a token id to the revocation list
///
/// Entries whose token has expired anyway are purged on the way.
///
/// # Returns
/// * `true` if this call revoked the token
/// * `false` if it was already revoked
///
/// The insert is the claim: of several concurrent calls with the same `jti`
/// exactly one sees `true`, so a single-use token can be spent only once.
pub async fn revoke_token(pool: &SqlitePool, jti: &str, expires_at: DateTime<Utc>) -> Result<bool> {
    let purged = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(pool)
        .await?;
    if purged.rows_affected() > 0 {
        tracing::debug!("Purged {} expired revocations", purged.rows_affected());
    }

    let inserted = sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
        .bind(jti)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(inserted.rows_affected() == 1)
}

pub async fn is_token_revoked(pool: &SqlitePool, jti: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revoked_tokens WHERE jti = ?")
        .bind(jti)
        .fetch_one(pool)
        .await?;

    Ok(count > 0)
}
