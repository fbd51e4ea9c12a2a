//! Data Transfer Objects for the agent-facing (`/proxy`, `/status`,
//! `/proxy/execute`) and dashboard-facing (`/approvals`) endpoints.
//!
//! Like the rest of the corpus this service was built from, every DTO
//! serializes `camelCase` over the wire regardless of the `snake_case`
//! Rust field names underneath.

use serde::{Deserialize, Serialize};
use shared::validation::validators;
use uuid::Uuid;
use validator::Validate;

use crate::domain::ApprovalEntry;
use crate::service::Headers;

// =============================================================================
// PROXY
// =============================================================================

/// Request body for `POST /proxy`.
///
/// `idempotency_key` may also be supplied via the `Idempotency-Key` header,
/// which takes precedence over this field when both are present.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequestDto {
    #[validate(custom(function = "validators::absolute_http_url"))]
    pub target_url: String,

    #[validate(custom(function = "validators::valid_http_method"))]
    pub method: String,

    #[serde(default)]
    pub headers: Option<Headers>,

    /// Raw body bytes, base64-encoded. `None` for bodyless methods.
    #[serde(default)]
    pub body: Option<String>,

    #[validate(length(min = 1, max = 500, message = "intent must be 1-500 characters"))]
    pub intent: String,

    #[validate(length(min = 1, max = 255, message = "idempotencyKey must be 1-255 characters"))]
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

// =============================================================================
// DASHBOARD: PENDING APPROVALS
// =============================================================================

/// One row of `GET /approvals/pending`'s `approvals` array.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovalDto {
    pub action_id: Uuid,
    pub agent_name: String,
    pub service_id: Uuid,
    pub method: String,
    pub target_url: String,
    pub intent: String,
    pub risk_score: f64,
    pub risk_explanation: String,
    pub request_headers: serde_json::Value,
    pub request_body: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingApprovalsResponse {
    pub approvals: Vec<PendingApprovalDto>,
}

/// Builds a [`PendingApprovalDto`] from a stored entry plus the display
/// name of the agent that created it. Body bytes, if present, are
/// base64-encoded for JSON transport.
pub fn pending_approval_dto(entry: ApprovalEntry, agent_name: String) -> PendingApprovalDto {
    use base64::Engine;
    PendingApprovalDto {
        action_id: entry.action_id,
        agent_name,
        service_id: entry.service_id,
        method: entry.method,
        target_url: entry.target_url,
        intent: entry.intent,
        risk_score: entry.risk_score,
        risk_explanation: entry.risk_explanation,
        request_headers: entry.stripped_headers,
        request_body: entry.body.as_deref().map(|b| base64::engine::general_purpose::STANDARD.encode(b)),
        created_at: entry.created_at,
    }
}

/// Response for `PATCH /approvals/:actionId/approve` and `.../deny`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecisionResponse {
    pub status: &'static str,
    pub action_id: Uuid,
}
