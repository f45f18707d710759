use actix_web::{
    HttpRequest, HttpResponse,
    cookie::{Cookie, SameSite, time::Duration as CookieDuration},
    web,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::{
    auth::{
        auth::{AuthUser, SESSION_COOKIE, session_tokens},
        credentials::CredentialStore,
        session::SessionGate,
    },
    error::{AppError, AppResult},
    model::{role::Role, user::Identity},
    models::{CreatedUser, LoginReqDto, LoginResponse, UserReq},
};

// auth end points

fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

/// Self-service registration. HR accounts can only be created by HR through
/// `POST /api/users`.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = UserReq,
    responses(
        (status = 201, description = "User registered", body = CreatedUser),
        (status = 400, description = "Missing field or unknown role"),
        (status = 403, description = "Role hr requested through public registration"),
        (status = 409, description = "Username already exists")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(user, credentials), fields(username = %user.username))]
pub async fn register(
    user: web::Json<UserReq>,
    credentials: web::Data<CredentialStore>,
) -> AppResult<HttpResponse> {
    if Role::parse(user.role.trim()) == Some(Role::Hr) {
        info!("Public registration of an hr account refused");
        return Err(AppError::Forbidden);
    }

    let id = credentials
        .register(&user.username, &user.password, &user.role)
        .await?;

    Ok(HttpResponse::Created().json(CreatedUser {
        message: "User registered successfully".to_string(),
        id,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = LoginResponse),
        (status = 400, description = "Missing field or invalid credentials", body = Object, example = json!({
            "error": "InvalidCredentials",
            "message": "Invalid username or password"
        })),
        (status = 503, description = "Session limit reached")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(user, sessions), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    sessions: web::Data<SessionGate>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Username and password required".to_string(),
        ));
    }

    let (token, claim) = sessions.authenticate(username, &user.password).await?;

    info!(user_id = claim.identity.id, "Login successful");

    let cookie = session_cookie(token.clone(), sessions.ttl().as_secs() as i64);
    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        message: "Login successful".to_string(),
        role: claim.identity.role,
        token,
        expires_at: claim.expires_at,
    }))
}

/// Destroys every session the request presents. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = Object, example = json!({
            "message": "Logged out successfully"
        }))
    ),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, sessions: web::Data<SessionGate>) -> HttpResponse {
    for token in session_tokens(&req) {
        sessions.invalidate(&token).await;
    }

    let mut removal = session_cookie(String::new(), 0);
    removal.make_removal();

    HttpResponse::Ok()
        .cookie(removal)
        .json(json!({ "message": "Logged out successfully" }))
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current identity", body = Identity),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(auth.0)
}
