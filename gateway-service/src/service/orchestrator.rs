//! Pipeline Orchestrator (C9): composes C3 (scope) -> C2 (URL policy) -> C5
//! (idempotency) -> C6 (risk) -> (C7 if blocked) -> C4 (credentials) -> C8
//! (forward), writes audit records best-effort, and performs the two-phase
//! approved-execute path.

use sha2::{Digest, Sha256};
use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::{IdempotencyPhase, IdempotencyRecord, NewApprovalEntry, Service};
use crate::repository::{AuditRepository, IdempotencyRepository, OpenOutcome};
use crate::service::approval_queue::ApprovalQueue;
use crate::service::credential_injector::CredentialInjector;
use crate::service::forwarder::{ForwardResponse, Forwarder};
use crate::service::risk_assessor::RiskAssessor;
use crate::service::scope_resolver::ScopeResolver;
use crate::service::{headers_from_json, headers_to_json, strip_auth_headers, Headers};

/// One inbound `POST /proxy` request, already parsed and validated at the
/// API layer.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub agent_id: Uuid,
    pub target_url: String,
    pub method: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
    pub intent: String,
    pub idempotency_key: Option<String>,
}

/// What `proxy()` produced: either a forwarded response or a risk-gated
/// block carrying the fields the `428` body requires.
#[derive(Debug, Clone)]
pub enum ProxyOutcome {
    Forwarded(ForwardResponse),
    Blocked { action_id: Uuid, risk_score: f64, risk_explanation: String, status_url: String },
}

/// What `execute_approved()` produced.
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Forwarded(ForwardResponse),
    /// Entry was `DENIED`/`EXPIRED`, or the final CAS lost a race. The
    /// response (if any was computed) must not be leaked to the caller.
    Gone,
    /// Entry is still `PENDING`.
    Pending,
}

pub struct Orchestrator {
    scope_resolver: ScopeResolver,
    idempotency: IdempotencyRepository,
    risk_assessor: RiskAssessor,
    approvals: ApprovalQueue,
    injector: CredentialInjector,
    forwarder: Forwarder,
    audit: AuditRepository,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope_resolver: ScopeResolver,
        idempotency: IdempotencyRepository,
        risk_assessor: RiskAssessor,
        approvals: ApprovalQueue,
        injector: CredentialInjector,
        forwarder: Forwarder,
        audit: AuditRepository,
    ) -> Self {
        Self { scope_resolver, idempotency, risk_assessor, approvals, injector, forwarder, audit }
    }

    pub async fn proxy(&self, request: ProxyRequest) -> Result<ProxyOutcome, ApiError> {
        let service = self.scope_resolver.resolve(request.agent_id, &request.target_url).await?;

        // Written as soon as the service is known, not only on success, so
        // a rejected (e.g. SSRF-blocked) request still leaves an audit
        // trail. Best-effort: failing to append must never fail the
        // request itself.
        let audit = self
            .audit
            .append(
                request.agent_id,
                Some(service.service_id),
                None,
                &request.method,
                &request.target_url,
                &request.intent,
            )
            .await
            .ok();

        let result = self.run_pipeline(&request, &service).await;

        if let Some(audit) = &audit {
            let outcome = match &result {
                Ok(ProxyOutcome::Forwarded(resp)) => (Some(resp.status as i32), None),
                Ok(ProxyOutcome::Blocked { risk_score, risk_explanation, .. }) => (
                    Some(428),
                    Some(format!("blocked pending approval: score={risk_score:.2} ({risk_explanation})")),
                ),
                Err(err) => (None, Some(err.to_string())),
            };
            let _ = self.audit.mark_completed(audit.id, outcome.0, outcome.1.as_deref()).await;
        }

        result
    }

    async fn run_pipeline(&self, request: &ProxyRequest, service: &Service) -> Result<ProxyOutcome, ApiError> {
        super::url_policy::check(&request.target_url, &service.base_url)?;

        let mut idem_record: Option<IdempotencyRecord> = None;
        if let Some(key) = &request.idempotency_key {
            if let Some(replay) = self.open_idempotency(request, key, &mut idem_record).await? {
                return Ok(replay);
            }
        }

        let risk = self
            .risk_assessor
            .assess(&request.method, &request.target_url, &request.intent)
            .await;

        if risk.blocked {
            return self.enqueue_for_approval(request, service, risk, idem_record.as_ref()).await;
        }

        let injected = match self.injector.inject(&request.headers, service).await {
            Ok(headers) => headers,
            Err(err) => {
                self.fail_idempotency(idem_record.as_ref()).await;
                return Err(err);
            }
        };

        match self
            .forwarder
            .forward(&request.method, &request.target_url, &injected, request.body.as_deref())
            .await
        {
            Ok(resp) => {
                if let Some(record) = &idem_record {
                    let _ = self
                        .idempotency
                        .complete(record.id, resp.status as i32, headers_to_json(&resp.headers), &resp.body)
                        .await;
                }
                Ok(ProxyOutcome::Forwarded(resp))
            }
            Err(err) => {
                self.fail_idempotency(idem_record.as_ref()).await;
                Err(err)
            }
        }
    }

    /// Opens (or replays/rejects via) the idempotency record for `key`.
    /// Returns `Some(outcome)` when the caller should short-circuit with
    /// that outcome (a `Done` replay); otherwise populates `idem_record`
    /// and returns `None` so the pipeline continues.
    async fn open_idempotency(
        &self,
        request: &ProxyRequest,
        key: &str,
        idem_record: &mut Option<IdempotencyRecord>,
    ) -> Result<Option<ProxyOutcome>, ApiError> {
        let fingerprint = request_fingerprint(&request.method, &request.target_url, request.body.as_deref());
        let ttl = chrono::Duration::hours(24);

        match self.idempotency.open(request.agent_id, key, &fingerprint, ttl).await? {
            OpenOutcome::Opened(record) => {
                *idem_record = Some(record);
                Ok(None)
            }
            OpenOutcome::Existing(record) => match record.phase {
                IdempotencyPhase::Inflight => Err(ApiError::IdempotencyInFlight),
                IdempotencyPhase::Done => Ok(Some(ProxyOutcome::Forwarded(ForwardResponse {
                    status: record.cached_status.unwrap_or(0) as u16,
                    headers: headers_from_json(&record.cached_headers.clone().unwrap_or_default()),
                    body: record.cached_body.clone().unwrap_or_default(),
                }))),
                IdempotencyPhase::Errored => {
                    self.idempotency.delete_if_errored(record.id).await?;
                    match self.idempotency.open(request.agent_id, key, &fingerprint, ttl).await? {
                        OpenOutcome::Opened(fresh) => {
                            *idem_record = Some(fresh);
                            Ok(None)
                        }
                        OpenOutcome::Existing(raced) if raced.phase == IdempotencyPhase::Inflight => {
                            Err(ApiError::IdempotencyInFlight)
                        }
                        OpenOutcome::Existing(raced) => {
                            *idem_record = Some(raced);
                            Ok(None)
                        }
                    }
                }
            },
        }
    }

    async fn enqueue_for_approval(
        &self,
        request: &ProxyRequest,
        service: &Service,
        risk: super::risk_assessor::RiskAssessment,
        idem_record: Option<&IdempotencyRecord>,
    ) -> Result<ProxyOutcome, ApiError> {
        let stripped = strip_auth_headers(&request.headers);
        let entry = self
            .approvals
            .enqueue(NewApprovalEntry {
                agent_id: request.agent_id,
                service_id: service.service_id,
                method: request.method.clone(),
                target_url: request.target_url.clone(),
                stripped_headers: headers_to_json(&stripped),
                body: request.body.clone(),
                intent: request.intent.clone(),
                risk_score: risk.score,
                risk_explanation: risk.explanation,
            })
            .await?;

        // The request is parked, not fulfilled: an in-flight idempotency
        // record must not be marked `done`, or a retry after approval
        // would replay a response that was never produced. `errored`
        // lets the next `/proxy` call with the same key open a fresh
        // record once the action is resolved.
        self.fail_idempotency(idem_record).await;

        Ok(ProxyOutcome::Blocked {
            action_id: entry.action_id,
            risk_score: entry.risk_score,
            risk_explanation: entry.risk_explanation,
            status_url: format!("/status/{}", entry.action_id),
        })
    }

    async fn fail_idempotency(&self, idem_record: Option<&IdempotencyRecord>) {
        if let Some(record) = idem_record {
            let _ = self.idempotency.fail(record.id).await;
        }
    }

    /// Approved-execute path, triggered by `POST /proxy/execute/:actionId`.
    /// `agent_id` must own the entry; ownership is hidden behind a plain
    /// `NotFound`.
    pub async fn execute_approved(&self, action_id: Uuid, agent_id: Uuid) -> Result<ExecuteOutcome, ApiError> {
        let entry = self.approvals.fetch_for_agent(action_id, agent_id).await?;

        match entry.status {
            crate::domain::ApprovalStatus::Executed => {
                return Ok(ExecuteOutcome::Forwarded(ForwardResponse {
                    status: entry.cached_status.unwrap_or(0) as u16,
                    headers: headers_from_json(&entry.cached_headers.clone().unwrap_or_default()),
                    body: entry.cached_body.clone().unwrap_or_default(),
                }));
            }
            crate::domain::ApprovalStatus::Expired | crate::domain::ApprovalStatus::Denied => {
                return Ok(ExecuteOutcome::Gone);
            }
            crate::domain::ApprovalStatus::Pending => return Ok(ExecuteOutcome::Pending),
            crate::domain::ApprovalStatus::Approved => {}
        }

        // Re-fetch the service fresh: policy or credentials may have
        // changed since the entry was enqueued.
        let service = self.scope_resolver.service_by_id(entry.service_id).await?;
        super::url_policy::check(&entry.target_url, &service.base_url)?;

        let stored_headers = headers_from_json(&entry.stripped_headers);
        let injected = self.injector.inject(&stored_headers, &service).await?;

        let response = self
            .forwarder
            .forward(&entry.method, &entry.target_url, &injected, entry.body.as_deref())
            .await?;

        let fired = self
            .approvals
            .mark_executed(action_id, response.status as i32, headers_to_json(&response.headers), &response.body)
            .await?;

        if !fired {
            // Lost the race: the entry expired between the peek above and
            // this CAS. The response we just computed must be discarded,
            // not handed back.
            return Ok(ExecuteOutcome::Gone);
        }

        Ok(ExecuteOutcome::Forwarded(response))
    }
}

/// One-way digest of method+url+body, recorded alongside an idempotency
/// key for diagnostic purposes. A mismatch against a repeat call with the
/// same key is informational only, not rejected.
fn request_fingerprint(method: &str, target_url: &str, body: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\0");
    hasher.update(target_url.as_bytes());
    hasher.update(b"\0");
    hasher.update(body.unwrap_or_default());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_sensitive_to_inputs() {
        let a = request_fingerprint("POST", "https://api.example.com/x", Some(b"{}"));
        let b = request_fingerprint("POST", "https://api.example.com/x", Some(b"{}"));
        let c = request_fingerprint("POST", "https://api.example.com/x", Some(b"{\"n\":1}"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
