use std::ops::Deref;

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::header};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::user::Identity;

pub const SESSION_COOKIE: &str = "sid";

/// Session tokens presented by the request: the `sid` cookie first, then
/// `Authorization: Bearer`. Either one may be stale while the other is live.
pub fn session_tokens(req: &HttpRequest) -> Vec<String> {
    let cookie = req.cookie(SESSION_COOKIE).map(|c| c.value().to_owned());

    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned());

    cookie.into_iter().chain(bearer).filter(|t| !t.is_empty()).collect()
}

/// Identity resolved by `session_middleware` for the current request.
pub struct AuthUser(pub Identity);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Identity>()
                .cloned()
                .map(AuthUser)
                .ok_or(AppError::Unauthenticated),
        )
    }
}

impl AuthUser {
    pub fn require_hr(&self) -> Result<(), AppError> {
        self.0.require_hr()
    }
}

impl Deref for AuthUser {
    type Target = Identity;

    fn deref(&self) -> &Identity {
        &self.0
    }
}
