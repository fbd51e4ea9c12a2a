//! # Application Error Types
//!
//! Unified error handling for all microservices with automatic HTTP conversion.
//!
//! ## Design Philosophy
//!
//! This module follows the "make illegal states unrepresentable" principle.
//! Each error variant maps to a specific HTTP status code and error code,
//! ensuring consistent API responses across all services.
//!
//! ## Error Categories
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ApiError Categories                             │
//! ├─────────────────────────┬───────────────────┬────────────────────────────┤
//! │ Authentication (401)    │ Authorization(403)│ Validation (400)           │
//! ├─────────────────────────┼───────────────────┼────────────────────────────┤
//! │ TokenExpired            │                   │ ValidationError            │
//! │ InvalidToken            │                   │ BadRequest                 │
//! │ MissingAuth             │                   │                            │
//! ├─────────────────────────┴───────────────────┴────────────────────────────┤
//! │ Resources (404, 409)                        │ Server (500)              │
//! ├──────────────────────────────────────────────┼───────────────────────────┤
//! │ NotFound                                     │ DatabaseError             │
//! │ Conflict                                     │ InternalError             │
//! └──────────────────────────────────────────────┴───────────────────────────┘
//! ```
//!
//! Plus a proxy-pipeline-specific extension block (`TargetInvalid`,
//! `TargetForbidden`, `AmbiguousScope`, `CredentialsUnavailable`, `Blocked`,
//! `IdempotencyInFlight`, `PayloadTooLarge`, `Gone`, `Pending`, `BadGateway`,
//! `GatewayTimeout`) documented alongside those variants below.
//!
//! ## HTTP Response Format
//!
//! All errors are serialized to a consistent JSON format:
//!
//! ```json
//! {
//!   "code": "VALIDATION_ERROR",
//!   "message": "Validation error",
//!   "request_id": "550e8400-e29b-41d4-a716-446655440000",
//!   "details": { ... },
//!   "timestamp": "2024-01-15T10:30:00Z"
//! }
//! ```
//!
//! ## Framework Integration
//!
//! This module provides automatic conversion for both Actix-web and Axum:
//!
//! - **Actix-web**: `impl ResponseError for ApiError`
//! - **Axum**: `impl IntoResponse for ApiError`
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::errors::{ApiError, ApiResult};
//!
//! async fn get_user(id: Uuid) -> ApiResult<User> {
//!     let user = repo.find_by_id(id)
//!         .await
//!         .map_err(|e| ApiError::from(e))?  // DatabaseError → 500
//!         .ok_or(ApiError::NotFound {
//!             resource: format!("user:{}", id),
//!         })?;  // NotFound → 404
//!     
//!     Ok(user)
//! }
//! ```
//!
//! ## Related Documentation
//!
//! - See [`_docs/development/development-standards.md`] for error handling guidelines
//! - See [`_docs/business/functional-requirements.md`] for error code specifications
//! - See [`auth/jwt`](crate::auth::jwt) for token-related error handling

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for handlers and services.
///
/// Use this instead of `Result<T, ApiError>` for cleaner signatures:
///
/// ```rust,ignore
/// async fn handler() -> ApiResult<User> { ... }
/// ```
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Main Error Enum
// =============================================================================

/// Application error type with automatic HTTP status mapping.
///
/// Each variant represents a specific error condition and maps to an
/// appropriate HTTP status code. The `#[error]` attribute defines the
/// error message format.
///
/// ## Adding New Variants
///
/// When adding new error types:
/// 1. Choose the appropriate HTTP status code
/// 2. Add the variant with `#[error("...")]` for message format
/// 3. Update `status_code()` method
/// 4. Update `error_code()` method
/// 5. Update `is_server_error()` if applicable
/// 6. Add tests
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Authentication Errors (401 Unauthorized)
    // =========================================================================
    // These indicate the caller is not authenticated or their credentials are
    // invalid. The client should re-authenticate (dashboard: sign in again;
    // agent: check its Agent-Key).

    /// JWT dashboard session token has expired.
    /// Returns 401 Unauthorized.
    #[error("Token expired")]
    TokenExpired,

    /// JWT token is malformed, has invalid signature, or has been tampered with.
    /// Returns 401 Unauthorized.
    #[error("Invalid token")]
    InvalidToken,

    /// Request doesn't include required authentication (`Authorization` header
    /// for the dashboard, `Agent-Key` for agents), or the key doesn't resolve
    /// to an active agent.
    /// Returns 401 Unauthorized.
    #[error("Missing authentication")]
    MissingAuth,

    // =========================================================================
    // Validation Errors (400 Bad Request)
    // =========================================================================
    // Request is syntactically correct but semantically invalid.

    /// Request body failed validation rules.
    /// Contains field-level errors from the `validator` crate.
    /// Returns 400 Bad Request with details.
    #[error("Validation error")]
    ValidationError(#[from] ValidationErrors),

    /// Generic bad request with custom message.
    /// Use for validation that doesn't fit the validator pattern.
    /// Returns 400 Bad Request.
    #[error("Invalid input: {message}")]
    BadRequest {
        /// Human-readable description of what's wrong
        message: String,
    },

    // =========================================================================
    // Resource Errors (404 Not Found, 409 Conflict)
    // =========================================================================

    /// Requested resource doesn't exist.
    /// Returns 404 Not Found.
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Resource identifier (e.g., "user:123", "course:abc")
        resource: String,
    },

    /// Action would create duplicate or violate uniqueness constraint.
    /// Example: Registering with an email that's already in use.
    /// Returns 409 Conflict.
    #[error("Resource already exists: {resource}")]
    Conflict {
        /// Description of the conflict (e.g., "email already registered")
        resource: String,
    },

    // =========================================================================
    // Server Errors (500 Internal Server Error)
    // =========================================================================
    // These are logged as errors and monitored.
    // Details are NOT exposed to clients for security.

    /// PostgreSQL query failed.
    /// Wraps `sqlx::Error`. Details logged, generic message returned.
    /// Returns 500 Internal Server Error.
    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    /// Unspecified internal error.
    /// Use as last resort when no specific variant applies.
    /// Returns 500 Internal Server Error.
    #[error("Internal server error")]
    InternalError {
        /// Internal message for logging (not exposed to client)
        message: String,
    },

    // =========================================================================
    // Gateway-specific errors (proxy+approval pipeline)
    // =========================================================================
    // These don't arise in a typical CRUD service; they're specific to the
    // proxy pipeline's risk gate, idempotency cache, and approval queue.

    /// Request shape/target is malformed (bad URL, bad method, missing field).
    /// Returns 400 Bad Request.
    #[error("Invalid target: {message}")]
    TargetInvalid {
        message: String,
    },

    /// Target resolves to a disallowed scheme or address literal (SSRF guard),
    /// or the candidate path escapes the service's registered path prefix.
    /// Returns 403 Forbidden.
    #[error("Target forbidden")]
    TargetForbidden,

    /// Two or more scoped services tie for longest base-URL match.
    /// Returns 409 Conflict.
    #[error("Ambiguous scope")]
    AmbiguousScope,

    /// A credential required by the service's auth kind is missing, or
    /// decryption failed. Never includes the credential value.
    /// Returns 500 Internal Server Error.
    #[error("Credentials unavailable")]
    CredentialsUnavailable,

    /// The risk assessor determined this request requires human approval.
    /// Returns 428 Precondition Required, carrying `action_id`/`risk_score`/
    /// `risk_explanation`/`status_url` in the response body.
    #[error("Action requires approval")]
    Blocked {
        action_id: Uuid,
        risk_score: f64,
        risk_explanation: String,
        status_url: String,
    },

    /// An idempotency key is already `inflight` for this agent.
    /// Returns 409 Conflict.
    #[error("Request already in flight")]
    IdempotencyInFlight,

    /// The forwarded response (or its declared Content-Length) exceeded the
    /// 10 MiB body cap.
    /// Returns 413 Payload Too Large.
    #[error("Response payload too large")]
    PayloadTooLarge,

    /// An approved action's execute window (`approvalExpiresAt`) has elapsed,
    /// or the action was denied, or a concurrent execute already consumed it.
    /// Returns 410 Gone.
    #[error("Action no longer executable")]
    Gone,

    /// Execute was called on an action still awaiting dashboard approval.
    /// Returns 425 Too Early.
    #[error("Action pending approval")]
    Pending,

    /// Outbound forward to the target failed at the transport level (DNS,
    /// connection refused, TLS). The message must never include request
    /// headers, since those may carry injected credentials.
    /// Returns 502 Bad Gateway.
    #[error("Upstream request failed")]
    BadGateway,

    /// Outbound forward to the target exceeded its deadline.
    /// Returns 504 Gateway Timeout.
    #[error("Upstream request timed out")]
    GatewayTimeout,
}

// =============================================================================
// Error Methods
// =============================================================================

impl ApiError {
    /// Returns a machine-readable error code.
    ///
    /// These codes are stable and can be used by API clients for
    /// programmatic error handling. They follow the format:
    /// `CATEGORY_SPECIFIC_ERROR` in SCREAMING_SNAKE_CASE.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let error = ApiError::MissingAuth;
    /// assert_eq!(error.error_code(), "MISSING_AUTH");
    /// ```
    pub fn error_code(&self) -> &'static str {
        match self {
            // Authentication
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::MissingAuth => "MISSING_AUTH",
            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::BadRequest { .. } => "BAD_REQUEST",
            // Resources
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            // Server
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError { .. } => "INTERNAL_ERROR",
            // Gateway-specific
            Self::TargetInvalid { .. } => "TARGET_INVALID",
            Self::TargetForbidden => "TARGET_FORBIDDEN",
            Self::AmbiguousScope => "AMBIGUOUS_SCOPE",
            Self::CredentialsUnavailable => "CREDENTIALS_UNAVAILABLE",
            Self::Blocked { .. } => "BLOCKED",
            Self::IdempotencyInFlight => "IDEMPOTENCY_IN_FLIGHT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Gone => "GONE",
            Self::Pending => "PENDING",
            Self::BadGateway => "BAD_GATEWAY",
            Self::GatewayTimeout => "GATEWAY_TIMEOUT",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// This is the source of truth for error-to-status mapping.
    /// Both Actix-web and Axum implementations use this method.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 401 Unauthorized - Authentication required or failed
            Self::TokenExpired | Self::InvalidToken | Self::MissingAuth => {
                StatusCode::UNAUTHORIZED
            }

            // 400 Bad Request - Client sent invalid data
            Self::ValidationError(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found - Resource doesn't exist
            Self::NotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict - Would violate uniqueness/business rules
            Self::Conflict { .. } => StatusCode::CONFLICT,

            // 500 Internal Server Error - Something went wrong on our side
            Self::DatabaseError(_) | Self::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // Gateway-specific
            Self::TargetInvalid { .. } => StatusCode::BAD_REQUEST,
            Self::TargetForbidden => StatusCode::FORBIDDEN,
            Self::AmbiguousScope | Self::IdempotencyInFlight => StatusCode::CONFLICT,
            Self::CredentialsUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Blocked { .. } => StatusCode::PRECONDITION_REQUIRED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Gone => StatusCode::GONE,
            // RFC 8470 "Too Early" (425) has no associated constant in this
            // version of the `http` crate.
            Self::Pending => StatusCode::from_u16(425).expect("425 is a valid status code"),
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Returns `true` if this is a server-side error (5xx).
    ///
    /// Server errors should be:
    /// - Logged at ERROR level
    /// - Monitored and alerted
    /// - Not expose internal details to clients
    ///
    /// Client errors (4xx) are logged at WARN level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::InternalError { .. } | Self::CredentialsUnavailable)
    }

    /// Renders the gateway's own flat error body (`{"error", "statusCode"}`),
    /// distinct from the richer `ErrorResponse` used elsewhere in this crate.
    /// `Blocked` carries its extra fields alongside `error`/`statusCode`.
    pub fn to_gateway_body(&self) -> serde_json::Value {
        let status = self.status_code().as_u16();
        match self {
            Self::Blocked {
                action_id,
                risk_score,
                risk_explanation,
                status_url,
            } => serde_json::json!({
                "error": self.to_string(),
                "statusCode": status,
                "action_id": action_id,
                "risk_score": risk_score,
                "risk_explanation": risk_explanation,
                "status_url": status_url,
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
                "statusCode": status,
            }),
        }
    }
}

// =============================================================================
// Response Structure
// =============================================================================

/// Standard error response body for the API.
///
/// All API errors are serialized to this format for consistency.
/// This structure is returned as the JSON body of error responses.
///
/// ## Fields
///
/// - `code`: Machine-readable error code (e.g., "VALIDATION_ERROR")
/// - `message`: Human-readable message (for debugging, not for UI)
/// - `request_id`: UUID for tracing requests across services
/// - `details`: Additional context (validation errors, retry time, etc.)
/// - `timestamp`: When the error occurred (ISO 8601 format)
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code for programmatic handling
    pub code: String,
    
    /// Human-readable message (for debugging, not for user display)
    pub message: String,
    
    /// Request ID for tracing across services.
    /// Useful for correlating logs and support requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    
    /// Additional error details (varies by error type).
    /// - ValidationError: Field-level errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    
    /// When the error occurred (ISO 8601 format)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    /// Creates a new error response from an `ApiError`.
    ///
    /// Automatically extracts relevant details based on error type:
    /// - ValidationError: Includes field-level validation errors
    pub fn new(error: &ApiError) -> Self {
        // Extract type-specific details
        let details = match error {
            ApiError::ValidationError(errors) => {
                Some(serde_json::to_value(errors).unwrap_or_default())
            }
            // Server errors: Don't expose internal details
            ApiError::DatabaseError(_) | ApiError::InternalError { .. } => {
                // Log the actual error but don't expose to client
                None
            }
            _ => None,
        };

        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
            request_id: None,
            details,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Adds a request ID for tracing.
    ///
    /// The request ID should be generated at the API gateway or middleware
    /// and passed through all services for distributed tracing.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

// =============================================================================
// Actix-web Integration
// =============================================================================

/// Implements Actix-web's `ResponseError` trait.
///
/// This allows returning `ApiError` directly from handlers:
///
/// ```rust,ignore
/// async fn handler() -> Result<impl Responder, ApiError> {
///     Err(ApiError::NotFound { resource: "user:123".into() })
/// }
/// ```
///
/// The error is automatically converted to an HTTP response with:
/// - Appropriate status code
/// - JSON body with `ErrorResponse` structure
impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        // Delegate to our implementation
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_gateway_body())
    }
}

// =============================================================================
// Axum Integration
// =============================================================================

/// Implements Axum's `IntoResponse` trait.
///
/// This allows returning `ApiError` directly from handlers:
///
/// ```rust,ignore
/// async fn handler() -> Result<Json<User>, ApiError> {
///     Err(ApiError::NotFound { resource: "user:123".into() })
/// }
/// ```
///
/// The error is automatically converted to an HTTP response with:
/// - Appropriate status code
/// - JSON body with `ErrorResponse` structure
impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        // Convert actix_web StatusCode to axum's StatusCode
        // (They're different types from different crates)
        let status = if matches!(self, Self::Pending) {
            axum::http::StatusCode::from_u16(425).expect("425 is a valid status code")
        } else {
            match self.status_code() {
                StatusCode::UNAUTHORIZED => axum::http::StatusCode::UNAUTHORIZED,
                StatusCode::FORBIDDEN => axum::http::StatusCode::FORBIDDEN,
                StatusCode::BAD_REQUEST => axum::http::StatusCode::BAD_REQUEST,
                StatusCode::NOT_FOUND => axum::http::StatusCode::NOT_FOUND,
                StatusCode::CONFLICT => axum::http::StatusCode::CONFLICT,
                StatusCode::TOO_MANY_REQUESTS => axum::http::StatusCode::TOO_MANY_REQUESTS,
                StatusCode::SERVICE_UNAVAILABLE => axum::http::StatusCode::SERVICE_UNAVAILABLE,
                StatusCode::PRECONDITION_REQUIRED => axum::http::StatusCode::PRECONDITION_REQUIRED,
                StatusCode::PAYLOAD_TOO_LARGE => axum::http::StatusCode::PAYLOAD_TOO_LARGE,
                StatusCode::GONE => axum::http::StatusCode::GONE,
                StatusCode::BAD_GATEWAY => axum::http::StatusCode::BAD_GATEWAY,
                StatusCode::GATEWAY_TIMEOUT => axum::http::StatusCode::GATEWAY_TIMEOUT,
                _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            }
        };

        let body = self.to_gateway_body();
        (status, axum::Json(body)).into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_errors_return_401() {
        assert_eq!(ApiError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_resource_errors() {
        assert_eq!(
            ApiError::NotFound { resource: "user".to_string() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict { resource: "email".to_string() }.status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_error_codes_are_screaming_snake_case() {
        assert_eq!(ApiError::MissingAuth.error_code(), "MISSING_AUTH");
        assert_eq!(ApiError::NotFound { resource: "test".to_string() }.error_code(), "NOT_FOUND");
        assert_eq!(ApiError::BadRequest { message: "bad".to_string() }.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_server_errors_are_flagged() {
        assert!(ApiError::InternalError { message: "test".to_string() }.is_server_error());
        assert!(ApiError::CredentialsUnavailable.is_server_error());
        assert!(!ApiError::MissingAuth.is_server_error());
        assert!(!ApiError::NotFound { resource: "test".to_string() }.is_server_error());
    }

    #[test]
    fn test_error_response_includes_timestamp() {
        let error = ApiError::MissingAuth;
        let response = ErrorResponse::new(&error);

        // Timestamp should be recent (within last minute)
        let now = chrono::Utc::now();
        let diff = now - response.timestamp;
        assert!(diff.num_seconds() < 60);
    }

    #[test]
    fn test_error_response_with_request_id() {
        let error = ApiError::MissingAuth;
        let request_id = Uuid::new_v4();
        let response = ErrorResponse::new(&error).with_request_id(request_id);

        assert_eq!(response.request_id, Some(request_id.to_string()));
    }

    #[test]
    fn test_gateway_status_codes() {
        assert_eq!(
            ApiError::TargetInvalid { message: "bad scheme".into() }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::TargetForbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::AmbiguousScope.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::IdempotencyInFlight.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::CredentialsUnavailable.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::Gone.status_code(), StatusCode::GONE);
        assert_eq!(ApiError::Pending.status_code().as_u16(), 425);
        assert_eq!(ApiError::BadGateway.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::GatewayTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiError::Blocked {
                action_id: Uuid::new_v4(),
                risk_score: 0.9,
                risk_explanation: "risky".into(),
                status_url: "/status/x".into(),
            }
            .status_code()
            .as_u16(),
            428
        );
    }

    #[test]
    fn test_blocked_body_carries_action_fields() {
        let action_id = Uuid::new_v4();
        let error = ApiError::Blocked {
            action_id,
            risk_score: 0.87,
            risk_explanation: "method+intent judged risky".into(),
            status_url: format!("/status/{action_id}"),
        };
        let body = error.to_gateway_body();
        assert_eq!(body["action_id"], serde_json::json!(action_id));
        assert_eq!(body["statusCode"], 428);
        assert!(body["risk_score"].as_f64().unwrap() > 0.8);
    }

    #[test]
    fn test_gateway_body_never_includes_credential_material() {
        let error = ApiError::CredentialsUnavailable;
        let body = error.to_gateway_body();
        let rendered = body.to_string();
        assert!(!rendered.to_lowercase().contains("password"));
        assert!(!rendered.to_lowercase().contains("secret"));
    }
}

