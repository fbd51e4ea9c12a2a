//! Approval Queue (C7): durable state machine over risk-flagged requests.
//!
//! Every transition is delegated to [`ApprovalRepository`]'s
//! compare-and-swap `UPDATE ... WHERE status = $expected` statements; this
//! layer adds nothing but ownership checks and the ergonomics the
//! orchestrator and API layer need on top of those.
//!
//! Ownership is enforced on every externally-reachable operation: a
//! non-owning caller sees exactly the same `NotFound` a caller would see
//! for an action that never existed ("ownership hiding").

use chrono::Utc;
use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::{ApprovalEntry, ApprovalStatus, NewApprovalEntry};
use crate::repository::{AgentRepository, ApprovalRepository};

pub struct ApprovalQueue {
    repo: ApprovalRepository,
    agents: AgentRepository,
    execute_ttl: chrono::Duration,
}

impl ApprovalQueue {
    pub fn new(repo: ApprovalRepository, agents: AgentRepository, execute_ttl_hours: u64) -> Self {
        Self { repo, agents, execute_ttl: chrono::Duration::hours(execute_ttl_hours as i64) }
    }

    pub async fn enqueue(&self, entry: NewApprovalEntry) -> Result<ApprovalEntry, ApiError> {
        self.repo.enqueue(entry).await
    }

    /// Fetches an entry for the agent that owns it, used by `GET
    /// /status/:actionId` and the execute path. Any other agent gets the
    /// same `NotFound` as a nonexistent id.
    pub async fn fetch_for_agent(&self, action_id: Uuid, agent_id: Uuid) -> Result<ApprovalEntry, ApiError> {
        let entry = self
            .repo
            .find_by_action_id(action_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "approval".to_string() })?;

        if entry.agent_id != agent_id {
            return Err(ApiError::NotFound { resource: "approval".to_string() });
        }
        Ok(entry)
    }

    pub async fn list_pending_for_owner(&self, owner_user_id: Uuid) -> Result<Vec<ApprovalEntry>, ApiError> {
        self.repo.list_pending_for_owner(owner_user_id).await
    }

    /// `PENDING -> APPROVED` on behalf of the dashboard user that owns the
    /// entry's agent. `Conflict` if the entry isn't (or is no longer)
    /// pending, `NotFound` if it doesn't exist or belongs to someone else.
    pub async fn approve_for_owner(&self, action_id: Uuid, owner_user_id: Uuid) -> Result<(), ApiError> {
        self.entry_owned_by(action_id, owner_user_id).await?;
        let fired = self.repo.approve(action_id, self.execute_ttl).await?;
        if !fired {
            return Err(ApiError::Conflict { resource: "approval".to_string() });
        }
        Ok(())
    }

    /// `PENDING -> DENIED`, symmetric to [`Self::approve_for_owner`].
    pub async fn deny_for_owner(&self, action_id: Uuid, owner_user_id: Uuid) -> Result<(), ApiError> {
        self.entry_owned_by(action_id, owner_user_id).await?;
        let fired = self.repo.deny(action_id).await?;
        if !fired {
            return Err(ApiError::Conflict { resource: "approval".to_string() });
        }
        Ok(())
    }

    /// `APPROVED -> EXECUTED` compare-and-swap, used by the orchestrator's
    /// two-phase execute. Returns whether this call won the race.
    pub async fn mark_executed(
        &self,
        action_id: Uuid,
        status: i32,
        headers: serde_json::Value,
        body: &[u8],
    ) -> Result<bool, ApiError> {
        self.repo.mark_executed(action_id, status, headers, body).await
    }

    /// Ages out every `APPROVED` entry whose `approval_expires_at` has
    /// passed. Invoked by the background sweeper on a wall-clock tick.
    pub async fn sweep_expired(&self) -> Result<u64, ApiError> {
        self.repo.expire_stale_approved(Utc::now()).await
    }

    async fn entry_owned_by(&self, action_id: Uuid, owner_user_id: Uuid) -> Result<ApprovalEntry, ApiError> {
        let entry = self
            .repo
            .find_by_action_id(action_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "approval".to_string() })?;

        let agent = self
            .agents
            .find_by_id(entry.agent_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "approval".to_string() })?;

        if agent.owner_user_id != owner_user_id {
            return Err(ApiError::NotFound { resource: "approval".to_string() });
        }
        Ok(entry)
    }
}

/// Shapes an [`ApprovalEntry`] into the status response for its current
/// `status`. Kept free of any repository/service dependency so it can be
/// reused by both the agent-facing status endpoint and the dashboard
/// pending-list endpoint.
pub fn status_response(entry: &ApprovalEntry) -> serde_json::Value {
    match entry.status {
        ApprovalStatus::Pending => serde_json::json!({
            "status": "PENDING",
            "actionId": entry.action_id,
            "createdAt": entry.created_at,
        }),
        ApprovalStatus::Approved => serde_json::json!({
            "status": "APPROVED",
            "actionId": entry.action_id,
            "executeUrl": format!("/proxy/execute/{}", entry.action_id),
        }),
        ApprovalStatus::Denied => serde_json::json!({
            "status": "DENIED",
            "actionId": entry.action_id,
            "resolvedAt": entry.resolved_at,
        }),
        ApprovalStatus::Expired => serde_json::json!({
            "status": "EXPIRED",
            "actionId": entry.action_id,
        }),
        ApprovalStatus::Executed => serde_json::json!({
            "status": "EXECUTED",
            "actionId": entry.action_id,
            "result": {
                "status": entry.cached_status,
                "headers": entry.cached_headers,
                "body": entry.cached_body,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: ApprovalStatus) -> ApprovalEntry {
        ApprovalEntry {
            action_id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            method: "DELETE".to_string(),
            target_url: "https://api.example.com/x".to_string(),
            stripped_headers: serde_json::json!({}),
            body: None,
            intent: "cleanup".to_string(),
            risk_score: 0.9,
            risk_explanation: "risky".to_string(),
            status,
            created_at: Utc::now(),
            resolved_at: None,
            approval_expires_at: None,
            executed_at: None,
            cached_status: None,
            cached_headers: None,
            cached_body: None,
        }
    }

    #[test]
    fn pending_status_response_carries_created_at_not_execute_url() {
        let e = entry(ApprovalStatus::Pending);
        let body = status_response(&e);
        assert_eq!(body["status"], "PENDING");
        assert!(body.get("executeUrl").is_none());
    }

    #[test]
    fn approved_status_response_carries_opaque_execute_url() {
        let e = entry(ApprovalStatus::Approved);
        let body = status_response(&e);
        assert_eq!(body["executeUrl"], format!("/proxy/execute/{}", e.action_id));
    }

    #[test]
    fn executed_status_response_replays_cached_result() {
        let mut e = entry(ApprovalStatus::Executed);
        e.cached_status = Some(201);
        e.cached_body = Some(b"{\"ok\":true}".to_vec());
        let body = status_response(&e);
        assert_eq!(body["result"]["status"], 201);
    }
}
