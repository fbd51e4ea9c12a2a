//! # Service Layer
//!
//! The proxy+approval pipeline's components (C1-C9), each a thin,
//! independently testable piece composed by [`orchestrator::Orchestrator`].
//! Nothing here issues SQL directly; that is the repository layer's job.

pub mod approval_queue;
pub mod credential_injector;
pub mod forwarder;
pub mod orchestrator;
pub mod risk_assessor;
pub mod scope_resolver;
pub mod sweeper;
pub mod url_policy;
pub mod vault;

pub use approval_queue::ApprovalQueue;
pub use credential_injector::CredentialInjector;
pub use forwarder::{ForwardResponse, Forwarder};
pub use orchestrator::Orchestrator;
pub use risk_assessor::{RiskAssessment, RiskAssessor};
pub use scope_resolver::ScopeResolver;
pub use sweeper::Sweeper;
pub use vault::Vault;

use std::collections::BTreeMap;

/// String-keyed header representation shared by C4 (injector), C7 (queue),
/// C8 (forwarder) and C9 (orchestrator). Deliberately independent of any
/// HTTP framework's header type: the domain/service layers have no
/// actix-web dependency, only the API layer translates to/from it.
pub type Headers = BTreeMap<String, String>;

pub fn headers_to_json(headers: &Headers) -> serde_json::Value {
    serde_json::to_value(headers).unwrap_or_else(|_| serde_json::json!({}))
}

pub fn headers_from_json(value: &serde_json::Value) -> Headers {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

/// Removes any header that could carry credential material before an
/// approval entry is persisted. The queue must never store secrets; they
/// are re-fetched and re-injected at execute time.
pub fn strip_auth_headers(headers: &Headers) -> Headers {
    headers
        .iter()
        .filter(|(name, _)| {
            !name.eq_ignore_ascii_case("authorization") && !name.eq_ignore_ascii_case("x-api-key")
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_auth_headers_removes_authorization_case_insensitively() {
        let mut headers = Headers::new();
        headers.insert("AUTHORIZATION".to_string(), "Bearer secret".to_string());
        headers.insert("X-Api-Key".to_string(), "super-secret".to_string());
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let stripped = strip_auth_headers(&headers);

        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.get("Content-Type").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn headers_json_roundtrips() {
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        let json = headers_to_json(&headers);
        let back = headers_from_json(&json);
        assert_eq!(headers, back);
    }
}
