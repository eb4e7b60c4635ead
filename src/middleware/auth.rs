//! Admin authentication extractor and client-address helpers
//!
//! Administrator identity is established by the platform's identity service;
//! this module only verifies the bearer token it issued and exposes the
//! claims to handlers.

use actix_web::{dev::Payload, http::header, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::errors::AppError;
use crate::services::{AccessTokenClaims, JwtService};

/// Key for storing verified claims in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedClaims(pub AccessTokenClaims);

/// Extractor for admin users - returns 401 without a valid token, 403 for
/// a valid token without the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AccessTokenClaims);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let jwt_service = match req.app_data::<Arc<JwtService>>() {
            Some(service) => service.clone(),
            None => {
                tracing::error!("JwtService not found in app data");
                return ready(Err(AppError::internal("Authentication service not available")));
            }
        };

        let token = extract_bearer_token(req);

        match token {
            Some(token) => match jwt_service.verify_access_token(&token) {
                Ok(claims) => {
                    if !claims.is_admin() {
                        return ready(Err(AppError::Forbidden));
                    }
                    req.extensions_mut().insert(AuthenticatedClaims(claims.clone()));
                    ready(Ok(AdminUser(claims)))
                }
                Err(e) => ready(Err(e)),
            },
            None => ready(Err(AppError::Unauthorized)),
        }
    }
}

/// Extract a bearer token from the Authorization header
fn extract_bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Extract the client IP as an opaque string.
///
/// Proxy headers win over the peer address; the value is recorded verbatim
/// and never normalized.
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    if let Some(forwarded) = req.headers().get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first) = forwarded_str.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return Some(first.to_string());
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            if !ip_str.is_empty() {
                return Some(ip_str.to_string());
            }
        }
    }

    req.connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_extract_bearer_token() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(extract_bearer_token(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        let req = TestRequest::default().to_http_request();
        assert!(extract_bearer_token(&req).is_none());

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(extract_bearer_token(&req).is_none());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .insert_header(("X-Real-IP", "198.51.100.2"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_real_ip_fallback() {
        let req = TestRequest::default()
            .insert_header(("X-Real-IP", "198.51.100.2"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("198.51.100.2"));
    }

    #[test]
    fn test_client_ip_is_opaque() {
        // Not parsed or normalized, recorded as sent
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "not-an-ip"))
            .to_http_request();
        assert_eq!(extract_client_ip(&req).as_deref(), Some("not-an-ip"));
    }
}
