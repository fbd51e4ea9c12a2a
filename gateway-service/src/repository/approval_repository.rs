//! Data access for the human-approval queue (C7).
//!
//! Every status transition is a compare-and-swap: `UPDATE ... WHERE
//! status = $expected`. None of these methods ever perform an
//! unconditional write to `status`, so two racing callers (an operator
//! clicking "approve" twice, the sweeper expiring a stale entry while a
//! human approves it) can never both succeed.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{ApprovalEntry, NewApprovalEntry};

#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, entry: NewApprovalEntry) -> Result<ApprovalEntry, ApiError> {
        sqlx::query_as::<_, ApprovalEntry>(
            r#"
            INSERT INTO approval_entries (
                action_id, agent_id, service_id, method, target_url, stripped_headers,
                body, intent, risk_score, risk_explanation, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.agent_id)
        .bind(entry.service_id)
        .bind(entry.method)
        .bind(entry.target_url)
        .bind(entry.stripped_headers)
        .bind(entry.body)
        .bind(entry.intent)
        .bind(entry.risk_score)
        .bind(entry.risk_explanation)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_by_action_id(&self, action_id: Uuid) -> Result<Option<ApprovalEntry>, ApiError> {
        sqlx::query_as::<_, ApprovalEntry>(
            r#"SELECT * FROM approval_entries WHERE action_id = $1"#,
        )
        .bind(action_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list_pending_for_owner(&self, owner_user_id: Uuid) -> Result<Vec<ApprovalEntry>, ApiError> {
        sqlx::query_as::<_, ApprovalEntry>(
            r#"
            SELECT a.* FROM approval_entries a
            JOIN agents ag ON ag.agent_id = a.agent_id
            WHERE ag.owner_user_id = $1 AND a.status = 'pending'
            ORDER BY a.created_at ASC
            "#,
        )
        .bind(owner_user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// `PENDING -> APPROVED`. Sets `approval_expires_at` so the sweeper
    /// can later age it out if nobody ever executes it.
    pub async fn approve(
        &self,
        action_id: Uuid,
        approval_ttl: chrono::Duration,
    ) -> Result<bool, ApiError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE approval_entries
            SET status = 'approved', resolved_at = $1, approval_expires_at = $2
            WHERE action_id = $3 AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(now + approval_ttl)
        .bind(action_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(result.rows_affected() == 1)
    }

    /// `PENDING -> DENIED`.
    pub async fn deny(&self, action_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_entries
            SET status = 'denied', resolved_at = $1
            WHERE action_id = $2 AND status = 'pending'
            "#,
        )
        .bind(Utc::now())
        .bind(action_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(result.rows_affected() == 1)
    }

    /// `APPROVED -> EXECUTED`, caching the forwarded response so a
    /// repeated poll of the same `action_id` returns the same body.
    pub async fn mark_executed(
        &self,
        action_id: Uuid,
        status: i32,
        headers: serde_json::Value,
        body: &[u8],
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_entries
            SET status = 'executed', executed_at = $1,
                cached_status = $2, cached_headers = $3, cached_body = $4
            WHERE action_id = $5 AND status = 'approved'
            "#,
        )
        .bind(Utc::now())
        .bind(status)
        .bind(headers)
        .bind(body)
        .bind(action_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(result.rows_affected() == 1)
    }

    /// `APPROVED -> EXPIRED` for entries whose `approval_expires_at` has
    /// passed. Called by the background sweeper; returns the number of
    /// rows aged out.
    pub async fn expire_stale_approved(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE approval_entries
            SET status = 'expired'
            WHERE status = 'approved' AND approval_expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(result.rows_affected())
    }
}
