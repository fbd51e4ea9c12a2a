//! # Dashboard Authentication Middleware
//!
//! Extracts and validates the dashboard session bearer token from HTTP
//! requests. The gateway's only notion of identity on the dashboard side is
//! `user_id`; the collaborator owns roles, profiles, and everything else.
//!
//! ## Authentication Flow
//!
//! ```text
//! ┌─────────┐     ┌──────────────┐     ┌─────────────┐     ┌─────────┐
//! │ Request │────►│ AuthMiddleware│────►│ Extract JWT │────►│ Validate│
//! └─────────┘     └──────────────┘     └─────────────┘     └────┬────┘
//!                                                                │
//!                 ┌──────────────┐     ┌─────────────┐          │
//!                 │   Handler    │◄────│ Insert User │◄─────────┘
//!                 │(AuthenticUser)│     │ Extension   │     (if valid)
//!                 └──────────────┘     └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shared::auth::{AuthMiddleware, JwtService, AuthenticatedUser};
//! use std::sync::Arc;
//!
//! let jwt_service = Arc::new(JwtService::new(config.jwt));
//! let auth = AuthMiddleware::new(jwt_service);
//!
//! async fn list_pending(user: AuthenticatedUser) -> impl Responder {
//!     // user.user_id scopes listPendingForUser
//! }
//! ```

use crate::auth::jwt::{Claims, JwtService};
use crate::errors::ApiError;
use actix_web::{dev::ServiceRequest, Error, HttpMessage};
use std::sync::Arc;
use uuid::Uuid;

/// The dashboard user behind a validated session token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self { user_id: claims.sub }
    }
}

/// Middleware for dashboard session authentication.
#[derive(Clone)]
pub struct AuthMiddleware {
    jwt_service: Arc<JwtService>,
}

impl AuthMiddleware {
    pub fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }

    /// Extracts and validates the user from a request.
    ///
    /// ## Errors
    ///
    /// - `ApiError::MissingAuth` - No Authorization header
    /// - `ApiError::InvalidToken` - Malformed token or invalid signature
    /// - `ApiError::TokenExpired` - Token has expired
    pub fn extract_user(&self, req: &ServiceRequest) -> Result<AuthenticatedUser, ApiError> {
        let auth_header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::MissingAuth)?;

        let token = JwtService::extract_from_header(auth_header)?;
        let claims = self.jwt_service.validate(token)?;

        Ok(AuthenticatedUser::from(claims))
    }

    /// Authenticates a request and stores the user in extensions, for later
    /// retrieval via the `AuthenticatedUser` extractor.
    pub fn authenticate(&self, req: &ServiceRequest) -> Result<(), ApiError> {
        let user = self.extract_user(req)?;
        req.extensions_mut().insert(user);
        Ok(())
    }
}

/// Extractor for the authenticated dashboard user in handlers.
impl actix_web::FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let result = req
            .extensions()
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| ApiError::MissingAuth.into());

        std::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticated_user_from_claims() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            iss: "test".to_string(),
            aud: "test".to_string(),
            exp: 0,
            iat: 0,
        };

        let user = AuthenticatedUser::from(claims.clone());
        assert_eq!(user.user_id, claims.sub);
    }
}
