use actix_web::{HttpResponse, web};
use serde_json::json;
use tracing::info;

use crate::auth::{auth::AuthUser, credentials::CredentialStore, session::SessionGate};
use crate::error::AppResult;
use crate::model::user::{UserId, UserSummary};
use crate::models::{CreatedUser, UserReq};

// HR only: every handler checks the role before touching the store

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users, without password hashes", body = [UserSummary]),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not hr")
    ),
    security(("session_cookie" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    credentials: web::Data<CredentialStore>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;

    let users = credentials.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserReq,
    responses(
        (status = 201, description = "User created", body = CreatedUser),
        (status = 400, description = "Missing field or unknown role"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not hr"),
        (status = 409, description = "Username already exists")
    ),
    security(("session_cookie" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    credentials: web::Data<CredentialStore>,
    payload: web::Json<UserReq>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;

    let id = credentials
        .register(&payload.username, &payload.password, &payload.role)
        .await?;

    info!(created_by = auth.id, user_id = id, "User provisioned");
    Ok(HttpResponse::Created().json(CreatedUser {
        message: "User created successfully".to_string(),
        id,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User and their attendance deleted"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Caller is not hr"),
        (status = 404, description = "No such user")
    ),
    security(("session_cookie" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    credentials: web::Data<CredentialStore>,
    sessions: web::Data<SessionGate>,
    path: web::Path<UserId>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;

    let user_id = path.into_inner();
    credentials.delete_user(user_id).await?;
    sessions.invalidate_user(user_id).await;

    info!(deleted_by = auth.id, user_id, "User removed");
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted" })))
}
