//! # Agent Gateway Service
//!
//! The **gateway-service** sits between AI agents and the external HTTP
//! services they're scoped to. Every agent-initiated request runs through a
//! fixed pipeline (scope resolution, SSRF policy, idempotency dedup, risk
//! assessment, credential injection, and forwarding) before it ever reaches
//! an upstream service. Requests the risk assessor flags are parked for
//! human approval instead of forwarded.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP Layer (api/)                        │
//! │   routes · handlers · agent_auth · dashboard_auth · dto          │
//! └─────────────────────────┬─────────────────────────────────────────┘
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                      │
//! │   vault · url_policy · scope_resolver · credential_injector      │
//! │   idempotency (repo) · risk_assessor · approval_queue            │
//! │   forwarder · orchestrator · sweeper                             │
//! └─────────────────────────┬─────────────────────────────────────────┘
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)                  │
//! └─────────────────────────┬─────────────────────────────────────────┘
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (domain/)                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use shared::auth::JwtService;
use shared::database;
use shared::tracing_config;
use shared::AppConfig;
use tracing::info;

mod api;
mod domain;
mod repository;
mod service;

use repository::{
    AgentRepository, ApprovalRepository, AuditRepository, CredentialRepository,
    IdempotencyRepository, ServiceRepository,
};
use service::{ApprovalQueue, CredentialInjector, Forwarder, Orchestrator, RiskAssessor, ScopeResolver, Sweeper, Vault};

/// Shared application state, constructed once at startup and handed to
/// every worker via `web::Data`.
///
/// `orchestrator` composes the full C3-C9 pipeline; `approvals` and
/// `agents` are also kept unwrapped here because the dashboard handlers and
/// the `Agent-Key` extractor need them directly, without going through the
/// orchestrator's `proxy`/`execute_approved` entry points.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub approvals: ApprovalQueue,
    pub agents: AgentRepository,
    pub jwt_service: Arc<JwtService>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "Starting gateway-service"
    );

    let db_pool = database::create_pool(&config.database)
        .await
        .expect("Failed to create database pool");

    let vault = Arc::new(
        Vault::derive(&config.vault.encryption_secret, &config.vault.encryption_salt)
            .expect("Failed to derive vault encryption key"),
    );

    // No automatic redirect-following: the forwarder and the Judge client
    // share this client, and neither should silently chase a 3xx.
    let http_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build outbound HTTP client");

    let agent_repo = AgentRepository::new(db_pool.clone());
    let service_repo = ServiceRepository::new(db_pool.clone());
    let credential_repo = CredentialRepository::new(db_pool.clone());
    let idempotency_repo = IdempotencyRepository::new(db_pool.clone());
    let approval_repo = ApprovalRepository::new(db_pool.clone());
    let audit_repo = AuditRepository::new(db_pool.clone());

    let scope_resolver = ScopeResolver::new(agent_repo.clone(), service_repo);
    let injector = CredentialInjector::new(credential_repo, vault);
    let risk_assessor = RiskAssessor::new(http_client.clone(), config.judge.clone(), config.risk.clone());
    let forwarder = Forwarder::new(http_client, Duration::from_secs(30));

    // Built twice from cloned, pool-backed repositories: once for the
    // orchestrator's internal pipeline, once for direct use by the
    // dashboard handlers and the background sweeper. Each repository wraps
    // a cheap `PgPool` clone, so this duplicates no connections.
    let approvals_for_orchestrator =
        ApprovalQueue::new(approval_repo.clone(), agent_repo.clone(), config.approval.execute_ttl_hours);
    let approvals_for_state =
        ApprovalQueue::new(approval_repo.clone(), agent_repo.clone(), config.approval.execute_ttl_hours);
    let approvals_for_sweeper =
        ApprovalQueue::new(approval_repo.clone(), agent_repo.clone(), config.approval.execute_ttl_hours);

    let orchestrator = Orchestrator::new(
        scope_resolver,
        idempotency_repo.clone(),
        risk_assessor,
        approvals_for_orchestrator,
        injector,
        forwarder,
        audit_repo,
    );

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let app_state = web::Data::new(AppState {
        orchestrator,
        approvals: approvals_for_state,
        agents: agent_repo.clone(),
        jwt_service,
    });

    let sweeper = Sweeper::new(approvals_for_sweeper, idempotency_repo, service::sweeper::DEFAULT_SWEEP_INTERVAL);
    tokio::spawn(sweeper.run());

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    info!("Server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin() // TODO: restrict to the dashboard's origin in production
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .configure(api::routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
