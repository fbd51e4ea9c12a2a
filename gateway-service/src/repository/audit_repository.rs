//! Append-only audit trail. Every method here is deliberately narrow:
//! `append` and `mark_completed`, nothing that rewrites history.
//!
//! Callers must treat failures from this repository as non-fatal: an
//! audit write failing must never cause a forwarded request to fail. See
//! [`crate::service::orchestrator`] for how that's enforced.

use chrono::Utc;
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::AuditRecord;

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        agent_id: Uuid,
        service_id: Option<Uuid>,
        idempotency_record_id: Option<Uuid>,
        method: &str,
        target_url: &str,
        intent: &str,
    ) -> Result<AuditRecord, ApiError> {
        sqlx::query_as::<_, AuditRecord>(
            r#"
            INSERT INTO audit_records (
                agent_id, service_id, idempotency_record_id, method, target_url, intent, requested_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(agent_id)
        .bind(service_id)
        .bind(idempotency_record_id)
        .bind(method)
        .bind(target_url)
        .bind(intent)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn mark_completed(
        &self,
        id: Uuid,
        status: Option<i32>,
        error_summary: Option<&str>,
    ) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            UPDATE audit_records
            SET completed_at = $1, status = $2, error_summary = $3
            WHERE id = $4
            "#,
        )
        .bind(Utc::now())
        .bind(status)
        .bind(error_summary)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }
}
