//! sentra-api - Main entry point
//!
//! This is the entry point for the Sentra access-log API server.

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sentra_api::{
    config::Config,
    middleware::{AccessLogCapture, RequestIdMiddleware, SecurityHeaders},
    routes,
    services::{AccessLogIngestor, DetectionEngine, IpAuthority, JwtConfig, JwtService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing/logging
    init_tracing(&config.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        "Starting sentra-api"
    );

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to database");
            e
        })?;

    info!("Database connection pool established");

    // Run database migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to run database migrations");
            e
        })?;

    info!("Database migrations completed successfully");

    // Test database connection
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Database health check failed");
            e
        })?;

    info!("Database health check passed");

    // Initialize JWT verification for the admin surface
    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        if config.is_production() {
            panic!("JWT_SECRET must be set in production");
        }
        "development-secret-key-min-32-chars-long!".to_string()
    });
    let jwt_issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| "sentra".to_string());
    let jwt_service = Arc::new(JwtService::new(JwtConfig::from_secret(&jwt_secret, &jwt_issuer)));

    info!("JWT service initialized");

    // Start the access-log writer pool
    let ingestor = AccessLogIngestor::new(pool.clone(), &config.ingestion);

    info!(
        queue_depth = config.ingestion.queue_depth,
        workers = config.ingestion.workers,
        "Access log ingestion started"
    );

    // Initialize detection engine and IP authority
    let detection_engine = web::Data::new(DetectionEngine::new(pool.clone(), config.detection.clone()));
    let ip_authority = web::Data::new(IpAuthority::new(pool.clone()));

    info!(
        time_window_minutes = config.detection.time_window_minutes,
        "Detection engine initialized"
    );

    // Spawn expired-ban cleanup background task (every 5 minutes)
    let janitor_pool = pool.clone();
    tokio::spawn(async move {
        info!("Ban cleanup task started");
        let janitor = IpAuthority::new(janitor_pool);
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            match janitor.cleanup_expired().await {
                Ok(deleted) => {
                    if deleted > 0 {
                        info!(deleted, "Cleaned up expired IP bans");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to cleanup expired IP bans");
                }
            }
        }
    });

    let server_addr = config.server_addr();
    let cors_origin = config.cors_origin.clone();

    info!(address = %server_addr, "Starting HTTP server");

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS for the admin frontend
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_origin_fn(|origin, _req_head| {
                origin.as_bytes().starts_with(b"http://localhost")
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            // Add middleware (order matters - executed in reverse order)
            .wrap(TracingLogger::default())
            .wrap(Logger::default())
            .wrap(SecurityHeaders)
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            // Capture runs outermost so every request is recorded
            .wrap(AccessLogCapture::new(ingestor.clone()))
            // Explicit JSON body size limit (32 KB)
            .app_data(web::JsonConfig::default().limit(32_768))
            // Add database pool to app state
            .app_data(web::Data::new(pool.clone()))
            // Add services to app state
            .app_data(jwt_service.clone())
            .app_data(detection_engine.clone())
            .app_data(ip_authority.clone())
            // Configure routes
            .configure(routes::configure)
    })
    .bind(&server_addr)?
    .shutdown_timeout(30)
    .run()
    .await?;

    Ok(())
}

/// Initialize tracing subscriber with JSON output for production
fn init_tracing(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
