//! Access log models
//!
//! One [`AccessLog`] row describes one inbound HTTP request. Rows are
//! immutable once written; field-length caps are applied before the record
//! ever reaches the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Byte caps applied to free-form request fields before persistence.
pub const URL_MAX_BYTES: usize = 2000;
pub const PATH_MAX_BYTES: usize = 500;
pub const USER_AGENT_MAX_BYTES: usize = 500;
pub const REFERER_MAX_BYTES: usize = 500;
pub const ERROR_MAX_BYTES: usize = 1000;

/// Access log database model
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AccessLog {
    pub id: Uuid,
    pub ip_address: Option<String>,
    pub method: String,
    pub url: String,
    pub path: String,
    pub status_code: Option<i32>,
    #[serde(rename = "responseTime")]
    pub response_time_ms: Option<i64>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub request_body: Option<JsonValue>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request descriptor handed to the ingestion pipeline
#[derive(Debug, Clone)]
pub struct CreateAccessLog {
    pub ip_address: Option<String>,
    pub method: String,
    pub url: String,
    pub path: String,
    pub status_code: Option<i32>,
    pub response_time_ms: Option<i64>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub request_body: Option<JsonValue>,
    pub error: Option<String>,
}

impl CreateAccessLog {
    pub fn new(method: impl Into<String>, url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            ip_address: None,
            method: method.into(),
            url: url.into(),
            path: path.into(),
            status_code: None,
            response_time_ms: None,
            user_agent: None,
            referer: None,
            tenant_id: None,
            user_id: None,
            request_body: None,
            error: None,
        }
    }

    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }

    pub fn with_status(mut self, status_code: i32) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_response_time(mut self, millis: i64) -> Self {
        self.response_time_ms = Some(millis.max(0));
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    pub fn with_tenant(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_request_body(mut self, body: JsonValue) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    /// Apply the field-length caps. Idempotent; called by the ingestion
    /// pipeline before a record is queued for persistence.
    pub fn truncated(mut self) -> Self {
        truncate_to_bytes(&mut self.url, URL_MAX_BYTES);
        truncate_to_bytes(&mut self.path, PATH_MAX_BYTES);
        if let Some(ua) = self.user_agent.as_mut() {
            truncate_to_bytes(ua, USER_AGENT_MAX_BYTES);
        }
        if let Some(referer) = self.referer.as_mut() {
            truncate_to_bytes(referer, REFERER_MAX_BYTES);
        }
        if let Some(error) = self.error.as_mut() {
            truncate_to_bytes(error, ERROR_MAX_BYTES);
        }
        self
    }
}

/// Truncate a string to at most `max` bytes without splitting a character.
fn truncate_to_bytes(value: &mut String, max: usize) {
    if value.len() <= max {
        return;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}

/// AND-combined filter for querying access logs
#[derive(Debug, Clone, Default)]
pub struct AccessLogFilter {
    pub ip_address: Option<String>,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub method: Option<String>,
    /// Substring match on the path component
    pub path: Option<String>,
    pub status_code: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Per-IP aggregate over a time window
#[derive(Debug, Clone, FromRow)]
pub struct IpAggregate {
    pub ip_address: String,
    pub count: i64,
    pub max_created_at: DateTime<Utc>,
}

/// Narrow per-IP row used by the detection engine
#[derive(Debug, Clone, FromRow)]
pub struct IpWindowRow {
    pub status_code: Option<i32>,
    pub method: String,
    pub path: String,
}

/// Per-IP row used for the admin statistics view
#[derive(Debug, Clone, FromRow)]
pub struct IpStatsRow {
    pub status_code: Option<i32>,
    pub method: String,
    pub path: String,
    pub response_time_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}
