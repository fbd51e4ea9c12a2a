//! # Repository Layer
//!
//! Encapsulates every SQL statement the gateway issues. Nothing above this
//! layer builds a query string; the service layer calls these methods and
//! gets back domain entities or [`shared::errors::ApiError`].
//!
//! Most of this domain's interesting behavior is concurrency control, not
//! CRUD: the idempotency and approval tables are only ever mutated through
//! `UPDATE ... WHERE <expected-state>` statements so that two racing
//! callers can't both "win" a transition.

pub mod agent_repository;
pub mod approval_repository;
pub mod audit_repository;
pub mod credential_repository;
pub mod idempotency_repository;
pub mod service_repository;

pub use agent_repository::AgentRepository;
pub use approval_repository::ApprovalRepository;
pub use audit_repository::AuditRepository;
pub use credential_repository::CredentialRepository;
pub use idempotency_repository::{IdempotencyRepository, OpenOutcome};
pub use service_repository::ServiceRepository;
