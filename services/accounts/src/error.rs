use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Accounts service error variants.
///
/// Authentication failures collapse to one variant per stage: a response never
/// says which of the submitted values was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid 2fa code")]
    InvalidCode,
    #[error("invalid token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("invalid email")]
    InvalidEmail,
    #[error("missing data")]
    MissingData,
    #[error("invalid query")]
    InvalidQuery,
    #[error("too many login codes")]
    TooManyLoginCodes,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AccountsError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidCode => "INVALID_CODE",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserAlreadyExists => "USER_ALREADY_EXISTS",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::MissingData => "MISSING_DATA",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::TooManyLoginCodes => "TOO_MANY_LOGIN_CODES",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::InvalidCode | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::InvalidEmail | Self::MissingData | Self::InvalidQuery => StatusCode::BAD_REQUEST,
            Self::TooManyLoginCodes => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountsError {
    fn into_response(self) -> Response {
        // The request span from TraceLayer already carries method/uri/status; only
        // internal faults need their anyhow chain logged.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}
