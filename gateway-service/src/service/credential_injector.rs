//! Credential Injector (C4): decrypts a service's stored credentials and
//! stamps the appropriate authentication header onto a *copy* of the
//! request headers, keyed by the service's declared `auth_kind`.
//!
//! Plaintext credentials live only on this call's stack; they are never
//! logged, never returned to the agent, and never written to an audit row.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::{AuthKind, Service};
use crate::repository::CredentialRepository;
use crate::service::vault::Vault;
use crate::service::Headers;

pub struct CredentialInjector {
    credentials: CredentialRepository,
    vault: Arc<Vault>,
}

impl CredentialInjector {
    pub fn new(credentials: CredentialRepository, vault: Arc<Vault>) -> Self {
        Self { credentials, vault }
    }

    /// Returns a new header map with credentials injected. `headers` is not
    /// mutated in place so callers that need the original (e.g. to persist
    /// a stripped copy in the approval queue) still have it.
    pub async fn inject(&self, headers: &Headers, service: &Service) -> Result<Headers, ApiError> {
        let mut injected = headers.clone();

        match service.auth_kind {
            AuthKind::Bearer => {
                let token = self.decrypt_named(service.service_id, "token").await?;
                injected.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
            AuthKind::Basic => {
                let username = self.decrypt_named(service.service_id, "username").await?;
                let password = self.decrypt_named(service.service_id, "password").await?;
                let encoded = BASE64.encode(format!("{username}:{password}"));
                injected.insert("Authorization".to_string(), format!("Basic {encoded}"));
            }
            AuthKind::Oauth2 => {
                let token = self.decrypt_named(service.service_id, "access_token").await?;
                injected.insert("Authorization".to_string(), format!("Bearer {token}"));
            }
            AuthKind::ApiKey => {
                let value = self.decrypt_named(service.service_id, "api_key").await?;
                injected.insert("X-API-Key".to_string(), value);
            }
        }

        Ok(injected)
    }

    async fn decrypt_named(&self, service_id: Uuid, name: &str) -> Result<String, ApiError> {
        let credential = self
            .credentials
            .find_by_service_and_name(service_id, name)
            .await?
            .ok_or(ApiError::CredentialsUnavailable)?;
        let plaintext = self.vault.decrypt(&credential.ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| ApiError::CredentialsUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `auth_kind` selection is the part of this component that doesn't
    /// need a live pool; the decrypt path itself is covered end-to-end by
    /// the orchestrator's tests against a test database.
    #[test]
    fn basic_auth_header_is_base64_of_username_colon_password() {
        let encoded = BASE64.encode("alice:hunter2");
        assert_eq!(encoded, "YWxpY2U6aHVudGVyMg==");
    }
}
