//! IP ban and allowlist models

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// IP ban database model. At most one row exists per IP address; refreshing
/// a ban updates the row in place.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IpBan {
    pub id: Uuid,
    pub ip_address: String,
    pub reason: String,
    pub banned_by: Option<Uuid>,
    /// None means the ban does not expire
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IpBan {
    /// Whether the ban is active at the given instant
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Data for creating or refreshing an IP ban
#[derive(Debug, Clone)]
pub struct CreateIpBan {
    pub ip_address: String,
    pub reason: String,
    pub banned_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}
