//! Admin token verification
//!
//! The platform's identity service issues the tokens; this service only
//! needs to verify them and read the claims. Token issuance is kept for
//! operational tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub access_token_expiry: Duration,
    pub issuer: String,
}

impl JwtConfig {
    /// Create config from a shared secret
    pub fn from_secret(secret: &str, issuer: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry: Duration::minutes(15),
            issuer: issuer.to_string(),
        }
    }
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
}

impl AccessTokenClaims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// Create an access token for the given subject
    pub fn create_access_token(
        &self,
        sub: Uuid,
        tenant_id: Option<String>,
        role: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now + self.config.access_token_expiry;

        let claims = AccessTokenClaims {
            sub,
            tenant_id,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: format!("at_{}", Uuid::new_v4().as_simple()),
            iss: self.config.issuer.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.config.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to create access token: {}", e)))?;

        Ok(token)
    }

    /// Verify an access token
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<AccessTokenClaims>(token, &self.config.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidCredentials,
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_round_trip() {
        let config = JwtConfig::from_secret("test-secret-key-12345", "localhost");
        let service = JwtService::new(config);
        let sub = Uuid::new_v4();

        let token = service
            .create_access_token(sub, Some("t_1".to_string()), "admin")
            .unwrap();
        let claims = service.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, sub);
        assert_eq!(claims.tenant_id.as_deref(), Some("t_1"));
        assert!(claims.is_admin());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuing = JwtService::new(JwtConfig::from_secret("test-secret-key-12345", "other"));
        let verifying = JwtService::new(JwtConfig::from_secret("test-secret-key-12345", "localhost"));

        let token = issuing
            .create_access_token(Uuid::new_v4(), None, "admin")
            .unwrap();
        assert!(verifying.verify_access_token(&token).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = JwtService::new(JwtConfig::from_secret("test-secret-key-12345", "localhost"));
        let token = service
            .create_access_token(Uuid::new_v4(), None, "admin")
            .unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(service.verify_access_token(&tampered).is_err());
    }

    #[test]
    fn test_non_admin_role() {
        let service = JwtService::new(JwtConfig::from_secret("test-secret-key-12345", "localhost"));
        let token = service
            .create_access_token(Uuid::new_v4(), None, "viewer")
            .unwrap();
        let claims = service.verify_access_token(&token).unwrap();
        assert!(!claims.is_admin());
    }
}
