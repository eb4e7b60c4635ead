//! Request validation utilities

use chrono::{DateTime, Utc};
use validator::ValidationErrors;

use crate::errors::AppError;

/// Parse an optional ISO-8601 timestamp query parameter.
pub fn parse_date(field: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            DateTime::parse_from_rfc3339(raw)
                .map(|parsed| Some(parsed.with_timezone(&Utc)))
                .map_err(|_| AppError::validation(field, "must be an ISO-8601 timestamp"))
        }
    }
}

/// Require that a date range is ordered when both ends are present.
pub fn validate_date_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AppError::validation("startDate", "must not be after endDate"));
        }
    }
    Ok(())
}

/// Convert derive-based validation failures into a 400 with the offending
/// field named.
pub fn into_app_error(errors: ValidationErrors) -> AppError {
    let (field, field_errors) = match errors.field_errors().into_iter().next() {
        Some(entry) => entry,
        None => return AppError::validation("request", "invalid request"),
    };

    let message = field_errors
        .first()
        .and_then(|e| e.message.as_ref())
        .map(|m| m.to_string())
        .unwrap_or_else(|| "invalid value".to_string());

    AppError::validation(field.to_string(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_rfc3339() {
        let parsed = parse_date("startDate", Some("2026-08-01T10:30:00Z")).unwrap();
        assert!(parsed.is_some());

        let with_offset = parse_date("startDate", Some("2026-08-01T12:30:00+02:00")).unwrap();
        assert_eq!(parsed, with_offset);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("endDate", Some("yesterday")).is_err());
        assert!(parse_date("endDate", Some("2026-13-01")).is_err());
    }

    #[test]
    fn test_parse_date_absent_or_blank() {
        assert_eq!(parse_date("startDate", None).unwrap(), None);
        assert_eq!(parse_date("startDate", Some("")).unwrap(), None);
        assert_eq!(parse_date("startDate", Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_date_range_ordering() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::hours(1);

        assert!(validate_date_range(Some(earlier), Some(later)).is_ok());
        assert!(validate_date_range(Some(later), Some(earlier)).is_err());
        assert!(validate_date_range(None, Some(later)).is_ok());
        assert!(validate_date_range(Some(earlier), None).is_ok());
    }
}
