//! Standardized API response types
//!
//! All admin endpoints wrap their payloads in a `data` envelope; list
//! endpoints add pagination metadata alongside it.

use actix_web::HttpResponse;
use serde::Serialize;

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

/// Pagination metadata
#[derive(Debug, Serialize, Clone)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

impl PageMeta {
    /// Compute pagination metadata for a result set
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Create a successful response with data
pub fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse { data })
}

/// Create a response for resource creation (201 Created)
pub fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse { data })
}

/// Create a response with pagination metadata
pub fn paginated<T: Serialize>(items: Vec<T>, page: i64, limit: i64, total: i64) -> HttpResponse {
    HttpResponse::Ok().json(PaginatedResponse {
        data: items,
        meta: PageMeta::new(page, limit, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct TestData {
        id: i32,
        name: String,
    }

    #[test]
    fn test_api_response_serialization() {
        let response = ApiResponse {
            data: TestData {
                id: 1,
                name: "test".to_string(),
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"data\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"name\":\"test\""));
    }

    #[test]
    fn test_page_meta() {
        let meta = PageMeta::new(1, 10, 100);
        assert_eq!(meta.total, 100);
        assert_eq!(meta.total_pages, 10);
    }

    #[test]
    fn test_page_meta_with_remainder() {
        let meta = PageMeta::new(1, 10, 25);
        assert_eq!(meta.total_pages, 3); // 25 / 10 = 2.5, rounds up
    }

    #[test]
    fn test_page_meta_empty() {
        let meta = PageMeta::new(1, 50, 0);
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn test_total_pages_key_is_camel_case() {
        let response = PaginatedResponse {
            data: vec![TestData {
                id: 1,
                name: "row".to_string(),
            }],
            meta: PageMeta::new(2, 50, 120),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"totalPages\":3"));
        assert!(!json.contains("total_pages"));
    }
}
