//! Access log admin handlers
//!
//! Read-only aggregations over the access-log store plus the ban action that
//! binds detection output to the IP authority.

use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use crate::errors::AppError;
use crate::middleware::AdminUser;
use crate::models::{AccessLogFilter, IpDetails, IpStats, SuspiciousIp};
use crate::repositories::AccessLogRepository;
use crate::responses::{created, paginated, success};
use crate::services::{DetectionEngine, DetectionOptions, IpAuthority, DEFAULT_MIN_RISK_SCORE};
use crate::validation::{self, into_app_error};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 50;

/// Default statistics window for the per-IP view
const DEFAULT_STATS_WINDOW_HOURS: i64 = 24;

/// Query parameters for listing access logs
#[derive(Debug, Deserialize, Validate)]
pub struct ListLogsQuery {
    #[serde(rename = "ipAddress")]
    pub ip_address: Option<String>,
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    #[serde(rename = "statusCode")]
    #[validate(range(min = 100, max = 599, message = "must be between 100 and 599"))]
    pub status_code: Option<i32>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub limit: Option<i64>,
}

/// GET /sp-admin/access-logs
/// List access logs with filters and pagination
pub async fn list_logs(
    _admin: AdminUser,
    pool: web::Data<PgPool>,
    query: web::Query<ListLogsQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(into_app_error)?;

    let start_date = validation::parse_date("startDate", query.start_date.as_deref())?;
    let end_date = validation::parse_date("endDate", query.end_date.as_deref())?;
    validation::validate_date_range(start_date, end_date)?;

    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let filter = AccessLogFilter {
        ip_address: query.ip_address.clone(),
        tenant_id: query.tenant_id.clone(),
        user_id: query.user_id.clone(),
        method: query.method.clone(),
        path: query.path.clone(),
        status_code: query.status_code,
        start_date,
        end_date,
    };

    let (logs, total) = AccessLogRepository::list_paginated(&pool, &filter, page, limit).await?;

    Ok(paginated(logs, page, limit, total))
}

/// Query parameters for the suspicious-IP listing
#[derive(Debug, Deserialize, Validate)]
pub struct SuspiciousQuery {
    #[serde(rename = "minRiskScore")]
    #[validate(range(min = 0, max = 100, message = "must be between 0 and 100"))]
    pub min_risk_score: Option<i64>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// GET /sp-admin/access-logs/suspicious
/// Rank suspicious IPs inside the analysis window
pub async fn list_suspicious_ips(
    _admin: AdminUser,
    engine: web::Data<DetectionEngine>,
    query: web::Query<SuspiciousQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(into_app_error)?;

    let start_date = validation::parse_date("startDate", query.start_date.as_deref())?;
    let end_date = validation::parse_date("endDate", query.end_date.as_deref())?;
    validation::validate_date_range(start_date, end_date)?;

    let options = DetectionOptions {
        overrides: None,
        start_date,
        end_date,
        min_risk_score: query.min_risk_score.map(|score| score as u8),
    };

    let suspicious = engine.detect_suspicious_ips(&options).await?;

    Ok(success(suspicious))
}

/// Window query parameters shared by the per-IP endpoints
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

/// GET /sp-admin/access-logs/ip/{ipAddress}
/// Per-IP statistics composed with ban and allowlist state
pub async fn get_ip_details(
    _admin: AdminUser,
    pool: web::Data<PgPool>,
    authority: web::Data<IpAuthority>,
    path: web::Path<String>,
    query: web::Query<WindowQuery>,
) -> Result<HttpResponse, AppError> {
    let ip_address = path.into_inner();

    let start_date = validation::parse_date("startDate", query.start_date.as_deref())?;
    let end_date = validation::parse_date("endDate", query.end_date.as_deref())?;
    validation::validate_date_range(start_date, end_date)?;

    let end = end_date.unwrap_or_else(Utc::now);
    let start = start_date.unwrap_or(end - Duration::hours(DEFAULT_STATS_WINDOW_HOURS));

    let rows = AccessLogRepository::list_ip_stats_rows(&pool, &ip_address, start, end).await?;
    let stats = IpStats::from_rows(&rows);

    let is_blacklisted = authority.is_blacklisted(&ip_address).await?;
    let is_whitelisted = authority.is_whitelisted(&ip_address).await?;

    Ok(success(IpDetails {
        ip_address,
        stats,
        is_blacklisted,
        is_whitelisted,
    }))
}

/// Request body for banning an IP
#[derive(Debug, Deserialize, Validate)]
pub struct BanRequest {
    #[validate(length(max = 500, message = "must be at most 500 characters"))]
    pub reason: Option<String>,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<String>,
}

/// POST /sp-admin/access-logs/ip/{ipAddress}/ban
/// Ban an IP, synthesizing the reason from detection output when absent
pub async fn ban_ip(
    admin: AdminUser,
    engine: web::Data<DetectionEngine>,
    authority: web::Data<IpAuthority>,
    path: web::Path<String>,
    body: web::Json<BanRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate().map_err(into_app_error)?;

    let ip_address = path.into_inner();
    let expires_at = validation::parse_date("expiresAt", body.expires_at.as_deref())?;

    let reason = match body.reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => reason.to_string(),
        _ => {
            let options = DetectionOptions {
                min_risk_score: Some(DEFAULT_MIN_RISK_SCORE),
                ..Default::default()
            };
            let suspicious = engine.detect_suspicious_ips(&options).await?;
            default_ban_reason(suspicious.iter().find(|entry| entry.ip_address == ip_address))
        }
    };

    let ban = authority
        .ban(&ip_address, &reason, Some(admin.0.sub), expires_at)
        .await?;

    Ok(created(ban))
}

/// Reason used when the administrator does not provide one.
fn default_ban_reason(entry: Option<&SuspiciousIp>) -> String {
    match entry {
        Some(entry) if !entry.suspicious_factors.is_empty() => format!(
            "Suspicious activity detected: {}",
            entry.suspicious_factors.join(", ")
        ),
        _ => "Banned from suspicious IPs list".to_string(),
    }
}
