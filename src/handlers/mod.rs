//! Request handlers
//!
//! This module contains all HTTP request handlers organized by domain.

pub mod access_log;

// Re-export handler functions for convenience
pub use access_log::{ban_ip, get_ip_details, list_logs, list_suspicious_ips};
