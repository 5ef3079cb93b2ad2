use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Machine-readable error codes returned to clients as `{"error": CODE}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // authentication
    AuthenticationRequired,
    TokenInvalid,
    IncorrectPassword,
    AccountNotApproved,
    SessionRequired,

    // authorization
    ObjectNotOwnedByUser,
    InsufficientPermissions,

    // lookups
    UserNotFound,
    PostNotFound,
    CommentNotFound,
    ImageNotFound,
    ReportNotFound,
    SessionNotFound,
    ApiKeyNotFound,
    LikeNotFound,
    FollowNotFound,
    BlockNotFound,

    // validation
    PasswordNonConforming,
    UsernameInvalid,
    DisplayNameInvalid,
    BioTooLong,
    PostTooShort,
    PostTooLong,
    CommentTooShort,
    CommentTooLong,
    ReportReasonMissing,
    ReportInfoTooLong,
    InviteCodeRequired,
    InviteCodeInvalid,
    InviteCodeLimitReached,
    CannotFollowSelf,
    CannotBlockSelf,
    UserBlocked,
    CannotRevokeCurrentSession,

    // conflicts
    UsernameTaken,
    AlreadyLiked,
    AlreadyFollowing,
    AlreadyBlocked,
    AlreadyReported,
    ReportAlreadyResolved,

    InternalError,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing, invalid or expired credential.
    #[error("Unauthenticated: {0:?}")]
    Unauthenticated(ErrorCode),

    /// Valid principal acting on something it does not own.
    #[error("Unauthorized: {0:?}")]
    Unauthorized(ErrorCode),

    /// Valid principal lacking an attribute or API-key permission.
    #[error("Forbidden: {0:?}")]
    Forbidden(ErrorCode),

    #[error("Not found: {0:?}")]
    NotFound(ErrorCode),

    #[error("Bad request: {0:?}")]
    Validation(ErrorCode),

    #[error("Conflict: {0:?}")]
    Conflict(ErrorCode),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthenticated(code)
            | AppError::Unauthorized(code)
            | AppError::Forbidden(code)
            | AppError::NotFound(code)
            | AppError::Validation(code)
            | AppError::Conflict(code) => *code,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Pool(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) => tracing::error!("Database error: {}", e),
            AppError::Pool(e) => tracing::error!("Pool error: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let body = serde_json::json!({ "error": self.code() });
        (self.status(), Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
