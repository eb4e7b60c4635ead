//! Suspicious-IP detection engine
//!
//! Turns raw access records inside a time window into a ranked list of
//! candidate IPs with a risk score, contributing factors, and a ban
//! recommendation. Nothing is cached or persisted; every call recomputes
//! from the store.
//!
//! Scoring intentionally divides by the configured window length rather
//! than the actual window width, while the reported requests-per-minute
//! divides by the actual width. Callers passing a custom window will see
//! the two disagree; the behaviour is kept for compatibility with the
//! established scoring model, pending product review.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::HashSet;

use crate::config::{DetectionConfig, DetectionOverrides};
use crate::errors::AppError;
use crate::models::suspicious::{
    FACTOR_FAILED_AUTH, FACTOR_HIGH_ERROR_RATE, FACTOR_HIGH_REQUEST_RATE, FACTOR_PROBING,
    FACTOR_SCANNING, FACTOR_VERY_HIGH_ERROR_RATE, FACTOR_VERY_HIGH_REQUEST_RATE,
};
use crate::models::{IpWindowRow, Recommendation, SuspiciousIp};
use crate::repositories::AccessLogRepository;

/// IPs scoring below this are omitted unless the caller overrides it.
pub const DEFAULT_MIN_RISK_SCORE: u8 = 30;

/// Unique-path count above which an IP counts as scanning.
const SCANNING_PATH_THRESHOLD: usize = 20;

/// Options for one detection run
#[derive(Debug, Clone, Default)]
pub struct DetectionOptions {
    /// Partial threshold overrides merged onto the engine configuration
    pub overrides: Option<DetectionOverrides>,
    /// Window start; defaults to `end - time_window_minutes`
    pub start_date: Option<DateTime<Utc>>,
    /// Window end; defaults to now
    pub end_date: Option<DateTime<Utc>>,
    /// Minimum risk score to include; defaults to [`DEFAULT_MIN_RISK_SCORE`]
    pub min_risk_score: Option<u8>,
}

/// Per-IP statistics computed over the analysis window
#[derive(Debug, Clone, Default)]
pub struct IpWindowStats {
    pub total_requests: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// Percentage in [0, 100]; 0 when there are no requests
    pub error_rate: f64,
    pub failed_auth_count: i64,
    pub unique_paths: usize,
    pub not_found_count: i64,
}

impl IpWindowStats {
    /// Derive statistics from the per-IP detail rows. `total_requests`
    /// comes from the aggregate count so that a degraded (empty) detail
    /// query still yields defaulted statistics rather than an error.
    pub fn from_rows(total_requests: i64, rows: &[IpWindowRow]) -> Self {
        let mut success_count = 0;
        let mut error_count = 0;
        let mut failed_auth_count = 0;
        let mut not_found_count = 0;
        let mut paths = HashSet::new();

        for row in rows {
            if let Some(status) = row.status_code {
                if (200..400).contains(&status) {
                    success_count += 1;
                }
                if status >= 400 {
                    error_count += 1;
                }
                if status == 401 || status == 403 {
                    failed_auth_count += 1;
                }
                if status == 404 {
                    not_found_count += 1;
                }
            }
            paths.insert(row.path.as_str());
        }

        let error_rate = if total_requests > 0 {
            (error_count as f64 / total_requests as f64) * 100.0
        } else {
            0.0
        };

        Self {
            total_requests,
            success_count,
            error_count,
            error_rate,
            failed_auth_count,
            unique_paths: paths.len(),
            not_found_count,
        }
    }
}

pub struct DetectionEngine {
    pool: PgPool,
    config: DetectionConfig,
}

impl DetectionEngine {
    pub fn new(pool: PgPool, config: DetectionConfig) -> Self {
        Self { pool, config }
    }

    /// Analyze the window and return suspicious IPs sorted by risk score
    /// descending (ties broken by most recent request).
    ///
    /// A missing `access_logs` table yields an empty list; any other
    /// storage error propagates.
    pub async fn detect_suspicious_ips(
        &self,
        options: &DetectionOptions,
    ) -> Result<Vec<SuspiciousIp>, AppError> {
        let config = match &options.overrides {
            Some(overrides) => self.config.merged(overrides),
            None => self.config.clone(),
        };
        let (start, end) = resolve_window(options.start_date, options.end_date, &config);
        let min_risk_score = options.min_risk_score.unwrap_or(DEFAULT_MIN_RISK_SCORE);
        let window_minutes = (end - start).num_milliseconds() as f64 / 60_000.0;

        let aggregates = AccessLogRepository::aggregate_by_ip(&self.pool, start, end).await?;

        let mut results = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates {
            let rows =
                AccessLogRepository::list_ip_window(&self.pool, &aggregate.ip_address, start, end)
                    .await?;
            let stats = IpWindowStats::from_rows(aggregate.count, &rows);

            let risk_score = risk_score(&stats, &config);
            if risk_score < min_risk_score {
                continue;
            }

            let factors = suspicious_factors(&stats, &config);
            let recommendation = recommend(risk_score, &factors);
            let requests_per_minute = if window_minutes > 0.0 {
                aggregate.count as f64 / window_minutes
            } else {
                0.0
            };

            results.push(SuspiciousIp {
                ip_address: aggregate.ip_address,
                risk_score,
                request_count: aggregate.count,
                requests_per_minute,
                error_rate: stats.error_rate,
                failed_auth_count: stats.failed_auth_count,
                suspicious_factors: factors,
                last_request_at: aggregate.max_created_at,
                recommendation,
            });
        }

        rank(&mut results);
        Ok(results)
    }
}

/// Resolve the closed analysis window: end defaults to now, start to
/// `end - time_window_minutes`.
pub fn resolve_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    config: &DetectionConfig,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let end = end.unwrap_or_else(Utc::now);
    let start = start.unwrap_or(end - Duration::minutes(config.time_window_minutes));
    (start, end)
}

/// Additive risk score, clamped to [0, 100]. The highest matching band in
/// each factor wins.
pub fn risk_score(stats: &IpWindowStats, config: &DetectionConfig) -> u8 {
    // Scoring divisor is the configured window length, not the actual
    // window width (see module docs).
    let rpm = if config.time_window_minutes > 0 {
        stats.total_requests as f64 / config.time_window_minutes as f64
    } else {
        0.0
    };

    let mut score: u32 = 0;

    if rpm >= config.very_high_request_rate {
        score += 40;
    } else if rpm >= config.high_request_rate {
        score += 25;
    } else if rpm >= 0.5 * config.high_request_rate {
        score += 10;
    }

    if stats.error_rate >= config.very_high_error_rate {
        score += 30;
    } else if stats.error_rate >= config.high_error_rate {
        score += 20;
    } else if stats.error_rate >= 0.5 * config.high_error_rate {
        score += 10;
    }

    if stats.failed_auth_count >= 2 * config.failed_auth_threshold {
        score += 20;
    } else if stats.failed_auth_count >= config.failed_auth_threshold {
        score += 15;
    } else if stats.failed_auth_count > 0 {
        score += 5;
    }

    if stats.unique_paths > SCANNING_PATH_THRESHOLD
        || stats.not_found_count as f64 > 0.5 * stats.total_requests as f64
    {
        score += 10;
    }

    score.min(100) as u8
}

/// Factors from the fixed vocabulary, in emission order. Thresholds match
/// the scoring bands.
pub fn suspicious_factors(stats: &IpWindowStats, config: &DetectionConfig) -> Vec<&'static str> {
    let rpm = if config.time_window_minutes > 0 {
        stats.total_requests as f64 / config.time_window_minutes as f64
    } else {
        0.0
    };

    let mut factors = Vec::new();

    if rpm >= config.very_high_request_rate {
        factors.push(FACTOR_VERY_HIGH_REQUEST_RATE);
    } else if rpm >= config.high_request_rate {
        factors.push(FACTOR_HIGH_REQUEST_RATE);
    }

    if stats.error_rate >= config.very_high_error_rate {
        factors.push(FACTOR_VERY_HIGH_ERROR_RATE);
    } else if stats.error_rate >= config.high_error_rate {
        factors.push(FACTOR_HIGH_ERROR_RATE);
    }

    if stats.failed_auth_count >= config.failed_auth_threshold {
        factors.push(FACTOR_FAILED_AUTH);
    }

    if stats.unique_paths > SCANNING_PATH_THRESHOLD {
        factors.push(FACTOR_SCANNING);
    }

    if stats.not_found_count as f64 > 0.5 * stats.total_requests as f64 {
        factors.push(FACTOR_PROBING);
    }

    factors
}

/// Recommendation from score and factor set. A very high request rate or
/// repeated failed auth forces a ban regardless of score.
pub fn recommend(risk_score: u8, factors: &[&'static str]) -> Recommendation {
    if risk_score >= 70
        || factors.contains(&FACTOR_VERY_HIGH_REQUEST_RATE)
        || factors.contains(&FACTOR_FAILED_AUTH)
    {
        Recommendation::Ban
    } else if risk_score >= 50 {
        Recommendation::Monitor
    } else {
        Recommendation::Safe
    }
}

/// Sort by risk score descending, most recent request first on ties.
fn rank(results: &mut [SuspiciousIp]) {
    results.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then(b.last_request_at.cmp(&a.last_request_at))
    });
}
