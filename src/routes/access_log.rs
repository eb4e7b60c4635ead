//! Admin access-log routes

use actix_web::web;

use crate::handlers;

/// Configure admin access-log routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/sp-admin")
            .route("/access-logs", web::get().to(handlers::list_logs))
            .route(
                "/access-logs/suspicious",
                web::get().to(handlers::list_suspicious_ips),
            )
            .route(
                "/access-logs/ip/{ipAddress}",
                web::get().to(handlers::get_ip_details),
            )
            .route(
                "/access-logs/ip/{ipAddress}/ban",
                web::post().to(handlers::ban_ip),
            ),
    );
}
