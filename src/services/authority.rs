//! IP management authority
//!
//! Single source of truth for ban and allowlist state. Detection output and
//! administrator decisions both funnel through [`IpAuthority::ban`]; the
//! unique index on `ip_bans.ip_address` keeps one active entry per IP.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateIpBan, IpBan};
use crate::repositories::IpBanRepository;

pub struct IpAuthority {
    pool: PgPool,
}

impl IpAuthority {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// True iff an active (non-expired) ban exists for the IP.
    pub async fn is_blacklisted(&self, ip_address: &str) -> Result<bool, AppError> {
        let ban = IpBanRepository::find_by_ip(&self.pool, ip_address).await?;
        Ok(ban.map_or(false, |ban| ban.is_active_at(Utc::now())))
    }

    /// True iff the IP is on the allowlist. Callers that gate traffic must
    /// give the allowlist precedence over any ban.
    pub async fn is_whitelisted(&self, ip_address: &str) -> Result<bool, AppError> {
        IpBanRepository::allowlist_contains(&self.pool, ip_address).await
    }

    /// Create or refresh a ban.
    ///
    /// Idempotent per IP: repeating the call updates reason, actor, and
    /// expiry on the existing entry.
    pub async fn ban(
        &self,
        ip_address: &str,
        reason: &str,
        banned_by: Option<Uuid>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<IpBan, AppError> {
        let ban = IpBanRepository::upsert(
            &self.pool,
            CreateIpBan {
                ip_address: ip_address.to_string(),
                reason: reason.to_string(),
                banned_by,
                expires_at,
            },
        )
        .await?;

        info!(ip = %ban.ip_address, reason = %ban.reason, "IP banned");
        Ok(ban)
    }

    /// Remove expired bans. Returns the number of entries deleted.
    pub async fn cleanup_expired(&self) -> Result<u64, AppError> {
        IpBanRepository::cleanup_expired(&self.pool).await
    }
}
