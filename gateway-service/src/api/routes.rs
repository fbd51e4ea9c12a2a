//! # Route Configuration
//!
//! ```text
//! /
//! ├── health                                    GET    → health_check
//! ├── proxy                                     POST   → proxy           (Agent-Key)
//! ├── status/{actionId}                         GET    → status          (Agent-Key)
//! ├── proxy/execute/{actionId}                  POST   → execute         (Agent-Key)
//! └── approvals/
//!     ├── pending                               GET    → list_pending    (bearer)
//!     └── {actionId}/
//!         ├── approve                           PATCH  → approve         (bearer)
//!         └── deny                              PATCH  → deny            (bearer)
//! ```
//!
//! Agent-facing routes authenticate via the `Agent-Key` header, resolved by
//! the [`super::agent_auth::AuthenticatedAgent`] extractor on each handler;
//! there is no separate `.wrap()` stage for them, since the lookup needs a
//! database round trip the extractor already performs. Dashboard routes
//! authenticate via the bearer token validated by
//! [`super::dashboard_auth::require_dashboard_user`], wrapped around the
//! `/approvals` scope.

use actix_web::middleware::from_fn;
use actix_web::web;

use super::{dashboard_auth, handlers};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/proxy", web::post().to(handlers::proxy))
        .route("/status/{action_id}", web::get().to(handlers::status))
        .route("/proxy/execute/{action_id}", web::post().to(handlers::execute))
        .service(
            web::scope("/approvals")
                .wrap(from_fn(dashboard_auth::require_dashboard_user))
                .route("/pending", web::get().to(handlers::list_pending))
                .route("/{action_id}/approve", web::patch().to(handlers::approve))
                .route("/{action_id}/deny", web::patch().to(handlers::deny)),
        );
}
