//! Data access for agents and their service scope bindings.
//!
//! Agents, and the scope bindings between them and services, are created and
//! managed by the CRUD collaborator, out of scope here; this repository
//! only exposes the reads the pipeline itself needs plus the `Agent-Key`
//! last-used touch.

use chrono::Utc;
use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Agent;

#[derive(Debug, Clone)]
pub struct AgentRepository {
    pool: PgPool,
}

impl AgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, agent_id: Uuid) -> Result<Option<Agent>, ApiError> {
        sqlx::query_as::<_, Agent>(r#"SELECT * FROM agents WHERE agent_id = $1"#)
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Looks an agent up by its key fingerprint. Only active agents are
    /// returned; a deactivated agent's key must stop authenticating
    /// immediately, not just lose its scope bindings.
    pub async fn find_active_by_fingerprint(
        &self,
        key_fingerprint: &str,
    ) -> Result<Option<Agent>, ApiError> {
        sqlx::query_as::<_, Agent>(
            r#"SELECT * FROM agents WHERE key_fingerprint = $1 AND active = TRUE"#,
        )
        .bind(key_fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn touch_last_used(&self, agent_id: Uuid) -> Result<(), ApiError> {
        sqlx::query(r#"UPDATE agents SET last_used_at = $1 WHERE agent_id = $2"#)
            .bind(Utc::now())
            .bind(agent_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    // =========================================================================
    // SCOPE BINDINGS (read-only; bindings themselves are CRUD-collaborator owned)
    // =========================================================================

    pub async fn list_scoped_services(&self, agent_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"SELECT service_id FROM scope_bindings WHERE agent_id = $1"#,
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
