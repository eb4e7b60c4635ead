//! Derived suspicious-IP and per-IP statistics models
//!
//! Nothing here is persisted; every value is recomputed from access records
//! on demand.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

/// Fixed vocabulary of suspicious factors, in emission order.
pub const FACTOR_VERY_HIGH_REQUEST_RATE: &str = "Very high request rate";
pub const FACTOR_HIGH_REQUEST_RATE: &str = "High request rate";
pub const FACTOR_VERY_HIGH_ERROR_RATE: &str = "Very high error rate";
pub const FACTOR_HIGH_ERROR_RATE: &str = "High error rate";
pub const FACTOR_FAILED_AUTH: &str = "Multiple failed auth attempts";
pub const FACTOR_SCANNING: &str = "Scanning behavior (many paths)";
pub const FACTOR_PROBING: &str = "High 404 rate (probing)";

/// Ban recommendation derived from score and factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Ban,
    Monitor,
    Safe,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Ban => "ban",
            Recommendation::Monitor => "monitor",
            Recommendation::Safe => "safe",
        }
    }
}

/// One ranked entry in the suspicious-IP listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousIp {
    pub ip_address: String,
    pub risk_score: u8,
    pub request_count: i64,
    pub requests_per_minute: f64,
    pub error_rate: f64,
    pub failed_auth_count: i64,
    pub suspicious_factors: Vec<&'static str>,
    pub last_request_at: DateTime<Utc>,
    pub recommendation: Recommendation,
}

/// A path and how often it was requested
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PathCount {
    pub path: String,
    pub count: i64,
}

/// Aggregated statistics for one IP over a window
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpStats {
    pub total_requests: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// Rounded average response time in milliseconds; 0 when no samples
    pub avg_response_time: i64,
    pub methods: BTreeMap<String, i64>,
    pub status_codes: BTreeMap<String, i64>,
    /// Top 10 paths by request count, ties broken by first occurrence
    pub paths: Vec<PathCount>,
    pub last_request_at: Option<DateTime<Utc>>,
}

impl IpStats {
    /// Aggregate statistics from per-IP rows ordered oldest first.
    pub fn from_rows(rows: &[super::access_log::IpStatsRow]) -> Self {
        let mut success_count = 0;
        let mut error_count = 0;
        let mut response_time_sum: i64 = 0;
        let mut response_time_samples: i64 = 0;
        let mut methods: BTreeMap<String, i64> = BTreeMap::new();
        let mut status_codes: BTreeMap<String, i64> = BTreeMap::new();
        // First-seen order, so count ties resolve to the earliest path
        let mut path_order: Vec<String> = Vec::new();
        let mut path_counts: HashMap<String, i64> = HashMap::new();

        for row in rows {
            if let Some(status) = row.status_code {
                if (200..400).contains(&status) {
                    success_count += 1;
                }
                if status >= 400 {
                    error_count += 1;
                }
                *status_codes.entry(status.to_string()).or_insert(0) += 1;
            }
            if let Some(millis) = row.response_time_ms {
                response_time_sum += millis;
                response_time_samples += 1;
            }
            *methods.entry(row.method.clone()).or_insert(0) += 1;

            match path_counts.entry(row.path.clone()) {
                Entry::Occupied(mut entry) => *entry.get_mut() += 1,
                Entry::Vacant(entry) => {
                    path_order.push(entry.key().clone());
                    entry.insert(1);
                }
            }
        }

        let avg_response_time = if response_time_samples > 0 {
            (response_time_sum as f64 / response_time_samples as f64).round() as i64
        } else {
            0
        };

        let mut paths: Vec<PathCount> = path_order
            .into_iter()
            .map(|path| {
                let count = path_counts[&path];
                PathCount { path, count }
            })
            .collect();
        // Stable sort keeps first-occurrence order within equal counts
        paths.sort_by(|a, b| b.count.cmp(&a.count));
        paths.truncate(10);

        Self {
            total_requests: rows.len() as i64,
            success_count,
            error_count,
            avg_response_time,
            methods,
            status_codes,
            paths,
            last_request_at: rows.last().map(|row| row.created_at),
        }
    }
}

/// Per-IP statistics composed with ban and allowlist state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpDetails {
    pub ip_address: String,
    #[serde(flatten)]
    pub stats: IpStats,
    pub is_blacklisted: bool,
    pub is_whitelisted: bool,
}
