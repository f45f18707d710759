use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::error;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::user::UserId;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

/// Where a user's day is in the check-in/check-out cycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
pub enum DayState {
    NoRecord,
    CheckedIn,
    CheckedOut,
}

/// Today's position in the cycle for one user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub state: DayState,
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: i64,
    pub user_id: UserId,
    pub date: NaiveDate,
    pub checkin_time: Option<DateTime<Utc>>,
    pub checkout_time: Option<DateTime<Utc>>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "userId": 2,
        "date": "2024-01-10",
        "checkinTime": "2024-01-10T09:00:00Z",
        "checkoutTime": "2024-01-10T17:00:00Z",
        "status": "Present",
        "clockAnomaly": false
    })
)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: UserId,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkin_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub checkout_time: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    /// Checkout recorded earlier than checkin (clock skew between processes).
    pub clock_anomaly: bool,
}

impl AttendanceRecord {
    pub fn state(&self) -> DayState {
        match (self.checkin_time, self.checkout_time) {
            (_, Some(_)) => DayState::CheckedOut,
            (Some(_), None) => DayState::CheckedIn,
            (None, None) => DayState::NoRecord,
        }
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AttendanceStatus>().map_err(|_| {
            error!(record_id = row.id, status = %row.status, "Unknown attendance status stored");
            AppError::StorageFailure
        })?;

        let clock_anomaly = matches!(
            (row.checkin_time, row.checkout_time),
            (Some(checkin), Some(checkout)) if checkout < checkin
        );

        Ok(AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            checkin_time: row.checkin_time,
            checkout_time: row.checkout_time,
            status,
            clock_anomaly,
        })
    }
}
