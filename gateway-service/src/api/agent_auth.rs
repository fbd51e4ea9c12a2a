//! Agent-Key authentication: resolves the `Agent-Key` header to a full
//! [`Agent`] row before a request reaches the pipeline orchestrator.
//!
//! Unlike the dashboard's [`shared::auth::middleware::AuthenticatedUser`],
//! which only needs to validate a signature, resolving an Agent-Key requires
//! a database lookup (`agents.key_fingerprint` is the only thing stored
//! server-side). The extractor does that lookup itself rather than relying
//! on a separate middleware stage to populate request extensions first.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use shared::auth::agent_key;
use shared::errors::ApiError;
use std::future::Future;
use std::pin::Pin;

use crate::domain::Agent;
use crate::AppState;

/// The agent behind a validated `Agent-Key` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedAgent(pub Agent);

const HEADER_NAME: &str = "Agent-Key";

impl FromRequest for AuthenticatedAgent {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let key = req
                .headers()
                .get(HEADER_NAME)
                .and_then(|h| h.to_str().ok())
                .ok_or(ApiError::MissingAuth)?;

            if !agent_key::is_well_formed(key) {
                return Err(ApiError::MissingAuth.into());
            }

            let state = req
                .app_data::<actix_web::web::Data<AppState>>()
                .ok_or_else(|| ApiError::InternalError { message: "app state unavailable".to_string() })?;

            let fingerprint = agent_key::fingerprint(key);
            let agent = state
                .agents
                .find_active_by_fingerprint(&fingerprint)
                .await?
                .ok_or(ApiError::MissingAuth)?;

            // The indexed lookup above already pinned the row; this re-check
            // is the constant-time comparison the Agent-Key format calls for,
            // so a timing difference between a near-miss and a genuine match
            // never reaches application code.
            if !agent_key::fingerprints_match(&fingerprint, &agent.key_fingerprint) {
                return Err(ApiError::MissingAuth.into());
            }

            // Fire-and-forget: a failed last-used update must never fail
            // the request it was piggybacking on.
            let agents = state.agents.clone();
            let agent_id = agent.agent_id;
            actix_web::rt::spawn(async move {
                let _ = agents.touch_last_used(agent_id).await;
            });

            Ok(AuthenticatedAgent(agent))
        })
    }
}
