//! # Authentication Module
//!
//! Two distinct authentication schemes meet here, matching the two classes
//! of caller the gateway serves:
//!
//! ```text
//! auth/
//! ├── jwt.rs        - dashboard session token validation (bearer, HS256)
//! ├── middleware.rs - Actix-web extractor wiring JWT -> AuthenticatedUser
//! └── agent_key.rs  - Agent-Key fingerprinting and constant-time comparison
//! ```
//!
//! Agents never see a JWT; dashboard users never see an Agent-Key. Both
//! schemes terminate in a typed identity (`AuthenticatedUser` or an
//! `Agent` row resolved by `agent_key::fingerprint`) before reaching the
//! pipeline orchestrator.

pub mod agent_key;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtService};
pub use middleware::{AuthMiddleware, AuthenticatedUser};
