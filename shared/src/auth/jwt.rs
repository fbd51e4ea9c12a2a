//! # JWT Validation (Dashboard Session Token)
//!
//! Validates bearer tokens issued by the external user-session collaborator
//! (login/registration is out of scope for this service; see the top-level
//! `shared` crate docs). This module only decodes and verifies; it never
//! mints tokens.
//!
//! ## Token Structure
//!
//! ```text
//! xxxxx.yyyyy.zzzzz
//! ├────┼─────┼────┤
//! │    │     │    └── Signature (verifies integrity)
//! │    │     └─────── Payload (claims)
//! │    └───────────── Header (algorithm and token type)
//! ```
//!
//! ## Claims
//!
//! | Claim | Description |
//! |-------|-------------|
//! | `sub` | Subject (the dashboard user's id) |
//! | `iss` | Issuer |
//! | `aud` | Audience |
//! | `exp` | Expiration time |
//! | `iat` | Issued at |
//!
//! ## Security Notes
//!
//! - HS256 (HMAC-SHA256); secret must be at least 32 characters.
//! - Signature, expiration, issuer, and audience are all checked.

use crate::config::JwtConfig;
use crate::errors::ApiError;
use jsonwebtoken::{decode, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for a dashboard session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the dashboard user's unique identifier (UUID).
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Validates dashboard session tokens issued by the external auth
/// collaborator. Created once at startup and shared across handlers.
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            decoding_key,
            config,
        }
    }

    /// Validates and decodes a dashboard session token.
    ///
    /// ## Errors
    ///
    /// - `ApiError::TokenExpired` - Token has expired
    /// - `ApiError::InvalidToken` - Invalid signature, issuer, or audience
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
                _ => ApiError::InvalidToken,
            })?;

        Ok(token_data.claims)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header.
    pub fn extract_from_header(auth_header: &str) -> Result<&str, ApiError> {
        auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::InvalidToken)
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test_secret_key_minimum_32_chars_required".to_string(),
            issuer: "dashboard-auth".to_string(),
            audience: "agent-gateway".to_string(),
        }
    }

    fn sign(config: &JwtConfig, claims: &Claims) -> String {
        let key = EncodingKey::from_secret(config.secret.as_bytes());
        encode(&Header::default(), claims, &key).unwrap()
    }

    #[test]
    fn test_validate_accepts_well_formed_token() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp: now + 900,
            iat: now,
        };
        let token = sign(&config, &claims);

        let service = JwtService::new(config);
        let decoded = service.validate(&token).unwrap();
        assert_eq!(decoded.sub, claims.sub);
    }

    #[test]
    fn test_validate_rejects_expired_token() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            exp: now - 10,
            iat: now - 1000,
        };
        let token = sign(&config, &claims);

        let service = JwtService::new(config);
        assert!(matches!(service.validate(&token), Err(ApiError::TokenExpired)));
    }

    #[test]
    fn test_validate_rejects_wrong_audience() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            iss: config.issuer.clone(),
            aud: "someone-else".to_string(),
            exp: now + 900,
            iat: now,
        };
        let token = sign(&config, &claims);

        let service = JwtService::new(config);
        assert!(matches!(service.validate(&token), Err(ApiError::InvalidToken)));
    }

    #[test]
    fn test_extract_from_header_valid() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let header = format!("Bearer {}", token);
        assert_eq!(JwtService::extract_from_header(&header).unwrap(), token);
    }

    #[test]
    fn test_extract_from_header_invalid() {
        let result = JwtService::extract_from_header("InvalidHeader token");
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }
}
