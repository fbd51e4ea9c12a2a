//! Core domain entities for the proxy+approval pipeline.
//!
//! These map directly to the tables created under `migrations/`. Unlike a
//! CRUD service's entities, most of the mutation here happens through
//! conditional `UPDATE ... WHERE status = $expected` statements rather than
//! a generic `update()`, see [`crate::repository`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// SERVICE
// =============================================================================

/// How the gateway authenticates outbound requests to a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum AuthKind {
    ApiKey,
    Bearer,
    Basic,
    Oauth2,
}

/// A user-registered external HTTP service that agents may be scoped to.
///
/// `base_url` is the string an agent's `targetUrl` must be prefixed by
/// (host match + path-prefix match, enforced by the URL policy, C2).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub service_id: Uuid,
    pub owner_user_id: Uuid,
    pub name: String,
    pub base_url: String,
    pub auth_kind: AuthKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// CREDENTIAL
// =============================================================================

/// An encrypted credential value scoped to one service.
///
/// `ciphertext` is the opaque `(iv || auth_tag || ct)` blob produced by
/// [`crate::service::vault::Vault::encrypt`]. Plaintext never reaches this
/// struct; only C1 (vault) and C4 (credential injector) ever see it decrypted.
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub credential_id: Uuid,
    pub service_id: Uuid,
    pub name: String,
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// AGENT
// =============================================================================

/// A non-human principal holding a long-lived Agent-Key, scoped to services
/// via the `scope_bindings` table (managed by the CRUD collaborator).
///
/// The plaintext key is never stored, only its SHA-256 `key_fingerprint`
/// (see [`shared::auth::agent_key`]). `key_prefix` is safe to display in a
/// dashboard (first 12 hex chars).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub agent_id: Uuid,
    pub owner_user_id: Uuid,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub key_fingerprint: String,
    pub key_prefix: String,
    pub active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// IDEMPOTENCY RECORD
// =============================================================================

/// Lifecycle phase of an idempotency record (C5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum IdempotencyPhase {
    Inflight,
    Done,
    Errored,
}

/// Per-`(agent_id, key)` deduplication record. See C5 in the component
/// design: `open()` inserts one of these under a serialisable transaction,
/// `complete()`/`fail()` transition it, and records past `expires_at` are
/// eligible for purge.
#[derive(Debug, Clone, FromRow)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub key: String,
    pub request_fingerprint: String,
    pub phase: IdempotencyPhase,
    pub cached_status: Option<i32>,
    pub cached_headers: Option<serde_json::Value>,
    pub cached_body: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

// =============================================================================
// AUDIT RECORD
// =============================================================================

/// Append-only record of a forwarded (or attempted) request. Writes are
/// best-effort: a failure to append must never fail the request itself.
#[derive(Debug, Clone, FromRow)]
pub struct AuditRecord {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub service_id: Option<Uuid>,
    pub idempotency_record_id: Option<Uuid>,
    pub method: String,
    pub target_url: String,
    pub intent: String,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: Option<i32>,
    pub error_summary: Option<String>,
}

// =============================================================================
// APPROVAL ENTRY
// =============================================================================

/// Status of a risk-flagged request awaiting (or past) human review.
///
/// Transitions: `Pending -> Approved -> Executed`, `Pending -> Denied`,
/// `Approved -> Expired`. All transitions go through a compare-and-swap
/// `UPDATE ... WHERE status = $expected`, never an unconditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
    Executed,
}

/// A risk-flagged request parked for human approval.
///
/// `stripped_headers` has had any `Authorization`/credential header removed
/// before storage; credentials are re-fetched and re-injected at execute
/// time, never persisted in the queue.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalEntry {
    pub action_id: Uuid,
    pub agent_id: Uuid,
    pub service_id: Uuid,
    pub method: String,
    pub target_url: String,
    pub stripped_headers: serde_json::Value,
    pub body: Option<Vec<u8>>,
    pub intent: String,
    pub risk_score: f64,
    pub risk_explanation: String,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub approval_expires_at: Option<DateTime<Utc>>,
    pub executed_at: Option<DateTime<Utc>>,
    pub cached_status: Option<i32>,
    pub cached_headers: Option<serde_json::Value>,
    pub cached_body: Option<Vec<u8>>,
}

impl ApprovalEntry {
    /// True once the entry has left `Pending` for the first time (i.e. has a
    /// `resolved_at`), used by callers deciding whether to surface a
    /// terminal-state response instead of polling again.
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

// =============================================================================
// DTOs FOR CREATION
// =============================================================================

/// Fields required to enqueue a new approval entry (C7 `enqueue`).
#[derive(Debug, Clone)]
pub struct NewApprovalEntry {
    pub agent_id: Uuid,
    pub service_id: Uuid,
    pub method: String,
    pub target_url: String,
    pub stripped_headers: serde_json::Value,
    pub body: Option<Vec<u8>>,
    pub intent: String,
    pub risk_score: f64,
    pub risk_explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_entry_is_resolved_only_after_leaving_pending() {
        let mut entry = ApprovalEntry {
            action_id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            method: "GET".into(),
            target_url: "https://api.example.com/x".into(),
            stripped_headers: serde_json::json!({}),
            body: None,
            intent: "read".into(),
            risk_score: 0.1,
            risk_explanation: "low risk".into(),
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            approval_expires_at: None,
            executed_at: None,
            cached_status: None,
            cached_headers: None,
            cached_body: None,
        };
        assert!(!entry.is_resolved());
        entry.resolved_at = Some(Utc::now());
        assert!(entry.is_resolved());
    }
}
