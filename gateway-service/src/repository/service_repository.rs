//! Data access for registered services (the external APIs an agent may be
//! scoped to).
//!
//! Services are created, updated, and deleted by the CRUD collaborator,
//! out of scope here; this repository only exposes the single read the
//! Scope Resolver (C3) needs.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Service;

#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: PgPool,
}

impl ServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, service_id: Uuid) -> Result<Option<Service>, ApiError> {
        sqlx::query_as::<_, Service>(r#"SELECT * FROM services WHERE service_id = $1"#)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_does_not_require_a_live_pool() {
        // PgPool::connect_lazy never touches the network; exercised here
        // only to confirm the repository is Send + Sync, not its queries.
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ServiceRepository>();
    }
}
