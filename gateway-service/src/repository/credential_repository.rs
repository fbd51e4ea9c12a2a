//! Data access for encrypted credentials. Ciphertext passes through
//! untouched; only [`crate::service::vault::Vault`] ever decrypts it.
//!
//! Credentials are written by the CRUD collaborator, out of scope here;
//! this repository only exposes the read the Credential Injector (C4)
//! needs.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Credential;

#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: PgPool,
}

impl CredentialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_service_and_name(
        &self,
        service_id: Uuid,
        name: &str,
    ) -> Result<Option<Credential>, ApiError> {
        sqlx::query_as::<_, Credential>(
            r#"SELECT * FROM credentials WHERE service_id = $1 AND name = $2"#,
        )
        .bind(service_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }
}
