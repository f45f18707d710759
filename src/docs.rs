use crate::model::attendance::{AttendanceRecord, AttendanceStatus, DayState, DaySummary};
use crate::model::role::Role;
use crate::model::user::{Identity, UserSummary};
use crate::models::{CreatedUser, LoginReqDto, LoginResponse, UserReq};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance Tracking

Daily check-in and check-out for attachees, interns and staff, with
accounts managed by HR.

### Security
Log in through `/auth/login`. The session token comes back both as the
`sid` cookie and in the body; protected endpoints accept either the cookie
or `Authorization: Bearer <token>`. Sessions last one hour.

### Rules
- One attendance record per user per UTC calendar day
- Check-out only after check-in, once
- User administration is restricted to the **hr** role
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::history,
        crate::api::attendance::today,

        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::delete_user
    ),
    components(
        schemas(
            Role,
            Identity,
            UserSummary,
            UserReq,
            LoginReqDto,
            LoginResponse,
            CreatedUser,
            AttendanceStatus,
            AttendanceRecord,
            DayState,
            DaySummary
        )
    ),
    modifiers(&SessionCookie),
    tags(
        (name = "Auth", description = "Registration, login and sessions"),
        (name = "Attendance", description = "Daily check-in and check-out"),
        (name = "Users", description = "HR user administration"),
    )
)]
pub struct ApiDoc;

struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("sid"))),
            );
        }
    }
}
