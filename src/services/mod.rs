//! Service layer
//!
//! This module contains the core services of the application.

pub mod authority;
pub mod detection;
pub mod ingestion;
pub mod jwt;

// Re-export commonly used types
pub use authority::IpAuthority;
pub use detection::{DetectionEngine, DetectionOptions, DEFAULT_MIN_RISK_SCORE};
pub use ingestion::AccessLogIngestor;
pub use jwt::{AccessTokenClaims, JwtConfig, JwtService};
