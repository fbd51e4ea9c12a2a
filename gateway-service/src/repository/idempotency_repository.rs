//! Data access for idempotency records (C5).
//!
//! `open()` is the only insert path and relies on the `(agent_id, key)`
//! unique index to do the real work: a second caller racing on the same
//! key gets a unique-violation, which we turn into "fetch what's there"
//! rather than a 500. `complete()`/`fail()` are compare-and-swap updates
//! guarded by `WHERE phase = 'inflight'` so a record can only be settled
//! once.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::IdempotencyRecord;

#[derive(Debug, Clone)]
pub struct IdempotencyRepository {
    pool: PgPool,
}

/// Outcome of attempting to open a new idempotency record.
pub enum OpenOutcome {
    /// No prior record existed; a fresh `inflight` row was created.
    Opened(IdempotencyRecord),
    /// A record already exists for this `(agent_id, key)`. The caller
    /// decides what to do based on its phase and whether the request
    /// fingerprint matches.
    Existing(IdempotencyRecord),
}

impl IdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn open(
        &self,
        agent_id: Uuid,
        key: &str,
        request_fingerprint: &str,
        ttl: chrono::Duration,
    ) -> Result<OpenOutcome, ApiError> {
        let expires_at = Utc::now() + ttl;
        let inserted = sqlx::query_as::<_, IdempotencyRecord>(
            r#"
            INSERT INTO idempotency_records (agent_id, key, request_fingerprint, phase, expires_at)
            VALUES ($1, $2, $3, 'inflight', $4)
            RETURNING *
            "#,
        )
        .bind(agent_id)
        .bind(key)
        .bind(request_fingerprint)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(record) => Ok(OpenOutcome::Opened(record)),
            Err(sqlx::Error::Database(ref db_err))
                if db_err.constraint() == Some("idempotency_records_agent_id_key_key") =>
            {
                let existing = self
                    .find(agent_id, key)
                    .await?
                    .ok_or_else(|| ApiError::InternalError {
                        message: "idempotency record vanished after unique violation".to_string(),
                    })?;
                Ok(OpenOutcome::Existing(existing))
            }
            Err(e) => Err(ApiError::InternalError { message: format!("database error: {e}") }),
        }
    }

    async fn find(
        &self,
        agent_id: Uuid,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, ApiError> {
        sqlx::query_as::<_, IdempotencyRecord>(
            r#"SELECT * FROM idempotency_records WHERE agent_id = $1 AND key = $2"#,
        )
        .bind(agent_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Transitions an `inflight` record to `done`, caching the response.
    /// Returns `true` if this call performed the transition (CAS won).
    pub async fn complete(
        &self,
        id: Uuid,
        status: i32,
        headers: serde_json::Value,
        body: &[u8],
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE idempotency_records
            SET phase = 'done', cached_status = $1, cached_headers = $2,
                cached_body = $3, completed_at = $4
            WHERE id = $5 AND phase = 'inflight'
            "#,
        )
        .bind(status)
        .bind(headers)
        .bind(body)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(result.rows_affected() == 1)
    }

    /// Transitions an `inflight` record to `errored` so a subsequent
    /// retry with the same key is allowed to re-attempt the call rather
    /// than being stuck behind a dead in-flight marker.
    pub async fn fail(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE idempotency_records
            SET phase = 'errored', completed_at = $1
            WHERE id = $2 AND phase = 'inflight'
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes an `errored` record so a retried attempt can open a fresh
    /// `inflight` one in its place. CAS-guarded: only deletes if the
    /// record is still `errored` when this runs.
    pub async fn delete_if_errored(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query(r#"DELETE FROM idempotency_records WHERE id = $1 AND phase = 'errored'"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected() == 1)
    }

    /// Deletes records past `expires_at`. Called by the background
    /// sweeper, not by request handlers.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = sqlx::query(r#"DELETE FROM idempotency_records WHERE expires_at < $1"#)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(result.rows_affected())
    }
}
