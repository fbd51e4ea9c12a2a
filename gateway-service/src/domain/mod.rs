//! Domain layer: plain data + the invariants that hold regardless of how
//! they're persisted or served. No `sqlx`/`actix-web` types leak past
//! `FromRow` derives here; the repository layer is the only thing that
//! talks to Postgres directly.

pub mod entities;

pub use entities::{
    Agent, ApprovalEntry, ApprovalStatus, AuditRecord, AuthKind, Credential, IdempotencyPhase,
    IdempotencyRecord, NewApprovalEntry, Service,
};
