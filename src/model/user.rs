use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::error;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::role::Role;

pub type UserId = i64;

/// Row of the `users` table. Never serialized: it carries the hash.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Verified identity of a logged-in user, as held in a session claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    #[schema(example = 1)]
    pub id: UserId,
    #[schema(example = "alice")]
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn require_hr(&self) -> Result<(), AppError> {
        if self.role.is_hr() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Public view of a user for the administrative list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    #[schema(example = 1)]
    pub id: UserId,
    #[schema(example = "intern1")]
    pub username: String,
    pub role: Role,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct UserSummaryRow {
    pub id: UserId,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

pub(crate) fn decode_role(user_id: UserId, raw: &str) -> Result<Role, AppError> {
    Role::parse(raw).ok_or_else(|| {
        error!(user_id, role = raw, "Unknown role stored for user");
        AppError::StorageFailure
    })
}

impl TryFrom<&UserRow> for Identity {
    type Error = AppError;

    fn try_from(row: &UserRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: row.id,
            username: row.username.clone(),
            role: decode_role(row.id, &row.role)?,
        })
    }
}

impl TryFrom<UserSummaryRow> for UserSummary {
    type Error = AppError;

    fn try_from(row: UserSummaryRow) -> Result<Self, Self::Error> {
        let role = decode_role(row.id, &row.role)?;
        Ok(UserSummary {
            id: row.id,
            username: row.username,
            role,
            created_at: row.created_at,
        })
    }
}
