//! IP ban and allowlist repository

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::{CreateIpBan, IpBan};

pub struct IpBanRepository;

impl IpBanRepository {
    /// Create or refresh a ban (upsert keyed on `ip_address`).
    ///
    /// The unique index on `ip_address` guarantees at most one row per IP;
    /// refreshing an existing ban overwrites reason, actor, and expiry.
    pub async fn upsert(pool: &PgPool, data: CreateIpBan) -> Result<IpBan, AppError> {
        let ban = sqlx::query_as::<_, IpBan>(
            r#"
            INSERT INTO ip_bans (ip_address, reason, banned_by, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ip_address) DO UPDATE
                SET reason = EXCLUDED.reason,
                    banned_by = EXCLUDED.banned_by,
                    expires_at = EXCLUDED.expires_at,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(&data.ip_address)
        .bind(&data.reason)
        .bind(data.banned_by)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(ban)
    }

    /// Fetch the ban entry for an IP, expired or not. Whether the ban is
    /// still active is decided by the caller via [`IpBan::is_active_at`].
    pub async fn find_by_ip(pool: &PgPool, ip_address: &str) -> Result<Option<IpBan>, AppError> {
        let ban = sqlx::query_as::<_, IpBan>("SELECT * FROM ip_bans WHERE ip_address = $1")
            .bind(ip_address)
            .fetch_optional(pool)
            .await?;

        Ok(ban)
    }

    /// Whether the IP is on the allowlist.
    pub async fn allowlist_contains(pool: &PgPool, ip_address: &str) -> Result<bool, AppError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM ip_allowlist WHERE ip_address = $1)",
        )
        .bind(ip_address)
        .fetch_one(pool)
        .await?;

        Ok(row.0)
    }

    /// Delete expired bans. Returns the number of rows removed.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM ip_bans WHERE expires_at IS NOT NULL AND expires_at < NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
