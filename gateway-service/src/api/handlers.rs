//! Request handlers bridging HTTP to the service layer. Each one extracts
//! and validates input, delegates to [`crate::service::orchestrator::Orchestrator`]
//! or [`crate::service::approval_queue::ApprovalQueue`], and maps the
//! result to the exact response shape each route specifies.

use actix_web::{web, HttpRequest, HttpResponse};
use base64::Engine;
use shared::auth::middleware::AuthenticatedUser;
use shared::{errors::ApiError, validation};
use uuid::Uuid;

use crate::api::agent_auth::AuthenticatedAgent;
use crate::api::dto::{
    pending_approval_dto, ApprovalDecisionResponse, PendingApprovalsResponse, ProxyRequestDto,
};
use crate::service::approval_queue;
use crate::service::orchestrator::{ExecuteOutcome, ProxyOutcome, ProxyRequest};
use crate::AppState;

// =============================================================================
// HEALTH CHECK
// =============================================================================

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "gateway-service",
    }))
}

// =============================================================================
// AGENT-FACING: PROXY
// =============================================================================

/// `POST /proxy`. Runs the full C3→C9 pipeline for the authenticated
/// agent and returns either the forwarded response or a `428` block body.
pub async fn proxy(
    req: HttpRequest,
    state: web::Data<AppState>,
    agent: AuthenticatedAgent,
    body: web::Json<ProxyRequestDto>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let idempotency_key = req
        .headers()
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or(body.idempotency_key);

    let decoded_body = body
        .body
        .as_deref()
        .map(|b| base64::engine::general_purpose::STANDARD.decode(b))
        .transpose()
        .map_err(|_| ApiError::TargetInvalid { message: "body must be valid base64".to_string() })?;

    let request = ProxyRequest {
        agent_id: agent.0.agent_id,
        target_url: body.target_url,
        method: body.method.to_uppercase(),
        headers: body.headers.unwrap_or_default(),
        body: decoded_body,
        intent: body.intent,
        idempotency_key,
    };

    match state.orchestrator.proxy(request).await? {
        ProxyOutcome::Forwarded(resp) => Ok(forwarded_response(resp)),
        ProxyOutcome::Blocked { action_id, risk_score, risk_explanation, status_url } => {
            Err(ApiError::Blocked { action_id, risk_score, risk_explanation, status_url })
        }
    }
}

fn forwarded_response(resp: crate::service::ForwardResponse) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(resp.status)
        .unwrap_or(actix_web::http::StatusCode::OK);
    let mut builder = HttpResponse::build(status);
    builder.insert_header(("X-Proxy-Status", "forwarded"));
    for (name, value) in &resp.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            actix_web::http::header::HeaderName::try_from(name.as_str()),
            actix_web::http::header::HeaderValue::try_from(value.as_str()),
        ) {
            builder.insert_header((name, value));
        }
    }
    builder.body(resp.body)
}

// =============================================================================
// AGENT-FACING: STATUS
// =============================================================================

/// `GET /status/:actionId`.
pub async fn status(
    state: web::Data<AppState>,
    agent: AuthenticatedAgent,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entry = state.approvals.fetch_for_agent(path.into_inner(), agent.0.agent_id).await?;
    Ok(HttpResponse::Ok().json(approval_queue::status_response(&entry)))
}

// =============================================================================
// AGENT-FACING: EXECUTE APPROVED ACTION
// =============================================================================

/// `POST /proxy/execute/:actionId`.
pub async fn execute(
    state: web::Data<AppState>,
    agent: AuthenticatedAgent,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let action_id = path.into_inner();
    match state.orchestrator.execute_approved(action_id, agent.0.agent_id).await? {
        ExecuteOutcome::Forwarded(resp) => Ok(forwarded_response(resp)),
        ExecuteOutcome::Gone => Err(ApiError::Gone),
        ExecuteOutcome::Pending => Err(ApiError::Pending),
    }
}

// =============================================================================
// DASHBOARD-FACING: PENDING APPROVALS
// =============================================================================

/// `GET /approvals/pending`.
pub async fn list_pending(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let entries = state.approvals.list_pending_for_owner(user.user_id).await?;

    let mut approvals = Vec::with_capacity(entries.len());
    for entry in entries {
        let agent_name = state
            .agents
            .find_by_id(entry.agent_id)
            .await?
            .map(|a| a.display_name)
            .unwrap_or_else(|| "unknown agent".to_string());
        approvals.push(pending_approval_dto(entry, agent_name));
    }

    Ok(HttpResponse::Ok().json(PendingApprovalsResponse { approvals }))
}

/// `PATCH /approvals/:actionId/approve`.
pub async fn approve(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let action_id = path.into_inner();
    state.approvals.approve_for_owner(action_id, user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApprovalDecisionResponse { status: "APPROVED", action_id }))
}

/// `PATCH /approvals/:actionId/deny`.
pub async fn deny(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let action_id = path.into_inner();
    state.approvals.deny_for_owner(action_id, user.user_id).await?;
    Ok(HttpResponse::Ok().json(ApprovalDecisionResponse { status: "DENIED", action_id }))
}
