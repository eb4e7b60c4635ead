//! Route configuration for the API
//!
//! This module organizes all API routes and their handlers.

pub mod access_log;
pub mod health;

use actix_web::web;

/// Configure all application routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(access_log::configure);

    // Root-level endpoints
    cfg.service(health::root_status);
    cfg.service(health::health_check);
}
