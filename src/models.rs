use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{role::Role, user::UserId};

/// Body of `POST /auth/register` and `POST /api/users`.
///
/// Fields default to empty so a missing field is reported as invalid input
/// rather than a deserialization failure.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserReq {
    #[serde(default)]
    #[schema(example = "alice")]
    pub username: String,
    #[serde(default)]
    #[schema(example = "pw1")]
    pub password: String,
    #[serde(default)]
    #[schema(example = "intern")]
    pub role: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[serde(default)]
    #[schema(example = "root")]
    pub username: String,
    #[serde(default)]
    #[schema(example = "1234")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub role: Role,
    pub token: String,
    #[schema(value_type = String, format = "date-time")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedUser {
    pub message: String,
    pub id: UserId,
}
