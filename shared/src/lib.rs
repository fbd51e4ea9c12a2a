//! # Agent Gateway - Shared Library
//!
//! Cross-cutting functionality used by `gateway-service`: configuration,
//! error handling, database pooling, tracing, validation, and the two
//! authentication schemes (dashboard JWT, agent key).
//!
//! ## Modules
//!
//! | Module | Purpose | Key Types |
//! |--------|---------|-----------|
//! | [`config`] | Environment-based configuration | [`AppConfig`] |
//! | [`errors`] | Standardized error handling | [`ApiError`], [`ApiResult`] |
//! | [`auth`] | JWT validation, agent-key fingerprinting, middleware | [`JwtService`] |
//! | [`database`] | PostgreSQL connection pool | [`create_pool`](database::create_pool) |
//! | [`tracing_config`] | Structured logging setup | [`init_tracing`](tracing_config::init_tracing) |
//! | [`validation`] | Request validation helpers | Custom validators |
//!
//! ## Design Decisions
//!
//! 1. **Single source of truth**: shared types live here to prevent drift
//!    if this gateway ever grows a second binary (e.g. a CLI admin tool).
//! 2. **Framework agnostic where possible**: error handling supports both
//!    Actix-web (used by `gateway-service`) and Axum.
//! 3. **Security first**: credential handling and agent-key comparison
//!    follow constant-time / fail-closed conventions throughout.
//! 4. **Observable by default**: structured logging and tracing built in.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::{AppConfig, ApiError, ApiResult};
//! use shared::auth::JwtService;
//! use shared::database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let db_pool = database::create_pool(&config.database).await?;
//!     let jwt = JwtService::new(config.jwt.clone());
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod tracing_config;
pub mod validation;

pub use config::AppConfig;
pub use errors::{ApiError, ApiResult};
