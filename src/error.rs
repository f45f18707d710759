use actix_web::{
    HttpRequest, HttpResponse, ResponseError, error::JsonPayloadError, http::StatusCode,
};
use derive_more::Display;
use serde_json::json;
use strum_macros::AsRefStr;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a request can end in. The variant name is sent to the
/// client as the `error` code, the `Display` text as the `message`.
#[derive(Debug, Display, AsRefStr)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    InvalidInput(String),
    // deliberately identical for unknown user and wrong password
    #[display(fmt = "Invalid username or password")]
    InvalidCredentials,
    #[display(fmt = "Username already exists")]
    DuplicateUsername,
    #[display(fmt = "Not logged in")]
    Unauthenticated,
    #[display(fmt = "You are not allowed to perform this action")]
    Forbidden,
    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "You must check in first")]
    NotCheckedIn,
    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,
    #[display(fmt = "Not found")]
    NotFound,
    #[display(fmt = "Too many open sessions, try again later")]
    SessionLimitReached,
    #[display(fmt = "Something went wrong, contact the system administrator")]
    StorageFailure,
    #[display(fmt = "Internal server error")]
    Internal,
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::DuplicateUsername
            | AppError::AlreadyCheckedIn
            | AppError::NotCheckedIn
            | AppError::AlreadyCheckedOut => StatusCode::CONFLICT,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::SessionLimitReached => StatusCode::SERVICE_UNAVAILABLE,
            AppError::StorageFailure | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.as_ref(),
            "message": self.to_string(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "Database error");
        AppError::StorageFailure
    }
}

/// Malformed or missing JSON bodies are reported as `InvalidInput` instead of
/// actix's plain-text 400.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::InvalidInput(format!("Invalid request body: {}", err)).into()
}
