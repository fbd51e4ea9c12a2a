//! Wires [`shared::auth::middleware::AuthMiddleware`] into the `/approvals`
//! scope so handlers can take [`shared::auth::middleware::AuthenticatedUser`]
//! as a plain extractor, exactly as its own doc comment describes.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::Error;
use shared::auth::middleware::AuthMiddleware;

use crate::AppState;

pub async fn require_dashboard_user(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let auth = {
        let state = req
            .app_data::<actix_web::web::Data<AppState>>()
            .expect("AppState missing from app_data");
        AuthMiddleware::new(state.jwt_service.clone())
    };

    auth.authenticate(&req)?;
    next.call(req).await
}
