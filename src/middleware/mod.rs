//! Custom middleware
//!
//! This module contains custom Actix-Web middleware.

pub mod access_log;
pub mod auth;
pub mod request_id;
pub mod security_headers;

// Re-export commonly used items
pub use access_log::AccessLogCapture;
pub use auth::{extract_client_ip, AdminUser, AuthenticatedClaims};
pub use request_id::RequestIdMiddleware;
pub use security_headers::SecurityHeaders;
