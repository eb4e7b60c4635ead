//! Access log repository
//!
//! Append-only store of request records. Queries degrade gracefully when the
//! schema is missing: a catalog-level error produces an empty result and a
//! warning instead of failing the caller.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use crate::errors::AppError;
use crate::models::{AccessLog, AccessLogFilter, CreateAccessLog, IpAggregate, IpStatsRow, IpWindowRow};

/// Hard cap on page size for access-log queries
pub const MAX_PAGE_SIZE: i64 = 100;

pub struct AccessLogRepository;

impl AccessLogRepository {
    /// Append a new access record. The store assigns `id` and `created_at`.
    pub async fn insert(pool: &PgPool, data: CreateAccessLog) -> Result<AccessLog, AppError> {
        let log = sqlx::query_as::<_, AccessLog>(
            r#"
            INSERT INTO access_logs (
                ip_address, method, url, path, status_code, response_time_ms,
                user_agent, referer, tenant_id, user_id, request_body, error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(&data.ip_address)
        .bind(&data.method)
        .bind(&data.url)
        .bind(&data.path)
        .bind(data.status_code)
        .bind(data.response_time_ms)
        .bind(&data.user_agent)
        .bind(&data.referer)
        .bind(&data.tenant_id)
        .bind(&data.user_id)
        .bind(&data.request_body)
        .bind(&data.error)
        .fetch_one(pool)
        .await?;

        Ok(log)
    }

    /// List access logs matching an AND-combined filter, newest first.
    ///
    /// Ordering is `created_at DESC` with a stable `id DESC` tie-break.
    /// Returns the matching page and the total match count.
    pub async fn list_paginated(
        pool: &PgPool,
        filter: &AccessLogFilter,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<AccessLog>, i64), AppError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * limit;

        let (where_clause, bind_count) = build_where_clause(filter);

        let query = format!(
            "SELECT * FROM access_logs {} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            where_clause,
            bind_count + 1,
            bind_count + 2
        );
        let count_query = format!("SELECT COUNT(*) FROM access_logs {}", where_clause);

        let rows = bind_filter(sqlx::query_as::<_, AccessLog>(&query), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await;

        let rows = match rows.map_err(AppError::from) {
            Ok(rows) => rows,
            Err(e) if e.is_catalog_missing() => {
                warn!("access_logs table or column missing, returning empty page");
                return Ok((Vec::new(), 0));
            }
            Err(e) => return Err(e),
        };

        let total: (i64,) = bind_filter(sqlx::query_as(&count_query), filter)
            .fetch_one(pool)
            .await?;

        Ok((rows, total.0))
    }

    /// Aggregate request counts per distinct non-null IP inside the closed
    /// window `[start, end]`.
    pub async fn aggregate_by_ip(
        pool: &PgPool,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<IpAggregate>, AppError> {
        let result = sqlx::query_as::<_, IpAggregate>(
            r#"
            SELECT ip_address, COUNT(*) AS count, MAX(created_at) AS max_created_at
            FROM access_logs
            WHERE ip_address IS NOT NULL
              AND created_at >= $1
              AND created_at <= $2
            GROUP BY ip_address
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await;

        match result.map_err(AppError::from) {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_catalog_missing() => {
                warn!("access_logs table or column missing, returning empty aggregate");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Narrow per-IP rows for the detection engine: status, method, path.
    pub async fn list_ip_window(
        pool: &PgPool,
        ip_address: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<IpWindowRow>, AppError> {
        let result = sqlx::query_as::<_, IpWindowRow>(
            r#"
            SELECT status_code, method, path
            FROM access_logs
            WHERE ip_address = $1
              AND created_at >= $2
              AND created_at <= $3
            "#,
        )
        .bind(ip_address)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await;

        match result.map_err(AppError::from) {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_catalog_missing() => {
                warn!(ip = %ip_address, "access_logs table or column missing, returning empty detail");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Per-IP rows for the admin statistics view, oldest first so that
    /// first-occurrence ordering is well defined.
    pub async fn list_ip_stats_rows(
        pool: &PgPool,
        ip_address: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<IpStatsRow>, AppError> {
        let result = sqlx::query_as::<_, IpStatsRow>(
            r#"
            SELECT status_code, method, path, response_time_ms, created_at
            FROM access_logs
            WHERE ip_address = $1
              AND created_at >= $2
              AND created_at <= $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(ip_address)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await;

        match result.map_err(AppError::from) {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_catalog_missing() => {
                warn!(ip = %ip_address, "access_logs table or column missing, returning empty stats");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Build the WHERE clause for an access-log filter. Returns the clause and
/// the number of bind parameters it consumes.
fn build_where_clause(filter: &AccessLogFilter) -> (String, usize) {
    let mut conditions = Vec::new();
    let mut idx = 0;

    let mut next = |condition: &str| {
        idx += 1;
        conditions.push(condition.replace("$n", &format!("${}", idx)));
    };

    if filter.ip_address.is_some() {
        next("ip_address = $n");
    }
    if filter.tenant_id.is_some() {
        next("tenant_id = $n");
    }
    if filter.user_id.is_some() {
        next("user_id = $n");
    }
    if filter.method.is_some() {
        next("method = $n");
    }
    if filter.path.is_some() {
        next("path LIKE $n");
    }
    if filter.status_code.is_some() {
        next("status_code = $n");
    }
    if filter.start_date.is_some() {
        next("created_at >= $n");
    }
    if filter.end_date.is_some() {
        next("created_at <= $n");
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    (clause, idx)
}

/// Bind filter values in the same order `build_where_clause` numbered them.
fn bind_filter<'q, O>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    filter: &'q AccessLogFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
    if let Some(ip) = &filter.ip_address {
        query = query.bind(ip);
    }
    if let Some(tenant_id) = &filter.tenant_id {
        query = query.bind(tenant_id);
    }
    if let Some(user_id) = &filter.user_id {
        query = query.bind(user_id);
    }
    if let Some(method) = &filter.method {
        query = query.bind(method);
    }
    if let Some(path) = &filter.path {
        query = query.bind(format!("%{}%", path));
    }
    if let Some(status_code) = filter.status_code {
        query = query.bind(status_code);
    }
    if let Some(start_date) = filter.start_date {
        query = query.bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        query = query.bind(end_date);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_empty_filter() {
        let (clause, binds) = build_where_clause(&AccessLogFilter::default());
        assert_eq!(clause, "");
        assert_eq!(binds, 0);
    }

    #[test]
    fn test_where_clause_single_filter() {
        let filter = AccessLogFilter {
            ip_address: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        let (clause, binds) = build_where_clause(&filter);
        assert_eq!(clause, "WHERE ip_address = $1");
        assert_eq!(binds, 1);
    }

    #[test]
    fn test_where_clause_combines_with_and() {
        let filter = AccessLogFilter {
            tenant_id: Some("t_1".to_string()),
            path: Some("/admin".to_string()),
            status_code: Some(404),
            ..Default::default()
        };
        let (clause, binds) = build_where_clause(&filter);
        assert_eq!(
            clause,
            "WHERE tenant_id = $1 AND path LIKE $2 AND status_code = $3"
        );
        assert_eq!(binds, 3);
    }

    #[test]
    fn test_where_clause_full_filter_numbering() {
        let now = Utc::now();
        let filter = AccessLogFilter {
            ip_address: Some("10.0.0.1".to_string()),
            tenant_id: Some("t_1".to_string()),
            user_id: Some("u_1".to_string()),
            method: Some("GET".to_string()),
            path: Some("/v1".to_string()),
            status_code: Some(200),
            start_date: Some(now),
            end_date: Some(now),
        };
        let (clause, binds) = build_where_clause(&filter);
        assert_eq!(binds, 8);
        assert!(clause.ends_with("created_at <= $8"));
    }
}
