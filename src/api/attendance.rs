use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::attendance::AttendanceLedger;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::attendance::{AttendanceRecord, DaySummary};

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/checkin",
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceRecord),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "error": "AlreadyCheckedIn",
            "message": "Already checked in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
) -> AppResult<HttpResponse> {
    let record = ledger.check_in(&auth, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/checkout",
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceRecord),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "Not checked in today, or already checked out", body = Object, example = json!({
            "error": "NotCheckedIn",
            "message": "You must check in first"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
) -> AppResult<HttpResponse> {
    let record = ledger.check_out(&auth, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance/history",
    responses(
        (status = 200, description = "Own records, most recent first", body = [AttendanceRecord]),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
) -> AppResult<HttpResponse> {
    let records = ledger.history(&auth).await?;
    Ok(HttpResponse::Ok().json(records))
}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's state for the caller", body = DaySummary),
        (status = 401, description = "Not logged in")
    ),
    security(("session_cookie" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    ledger: web::Data<AttendanceLedger>,
) -> AppResult<HttpResponse> {
    let summary = ledger.today(&auth, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(summary))
}
