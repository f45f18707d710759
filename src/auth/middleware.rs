use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorInternalServerError,
    web::Data,
};
use tracing::debug;

use crate::auth::{auth::session_tokens, session::SessionGate};
use crate::error::AppError;

/// Resolves the session token before any protected handler runs and stores
/// the identity in the request extensions. The first presented token that
/// resolves wins. Requests without a live session are answered with 401 here.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let sessions = req
        .app_data::<Data<SessionGate>>()
        .cloned()
        .ok_or_else(|| ErrorInternalServerError("Session gate missing"))?;

    for token in session_tokens(req.request()) {
        if let Ok(identity) = sessions.resolve(Some(&token)).await {
            req.extensions_mut().insert(identity);
            return next.call(req).await;
        }
    }

    debug!(path = %req.path(), "Rejected request without a live session");
    Ok(req.error_response(AppError::Unauthenticated))
}
