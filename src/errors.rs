use crate::subscription::Feature;
use axum::http::StatusCode;
use tracing::error;

/// Failures raised by the domain and storage layers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("backend is not configured; set SEITON_DATA_PATH")]
    BackendNotConfigured,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("limit of {limit} tasks/month reached; upgrade to Premium for unlimited tasks")]
    TaskLimitReached { limit: u64 },

    #[error("the {0} feature is not included in your plan")]
    FeatureLocked(Feature),

    #[error("unsupported data schema version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BackendNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotAuthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::TaskLimitReached { .. } | Self::FeatureLocked(_) => StatusCode::FORBIDDEN,
            Self::UnsupportedSchema { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short code carried in `?notice=` redirects of the HTML forms.
    pub fn notice_code(&self) -> &'static str {
        match self {
            Self::BackendNotConfigured => "backend-unavailable",
            Self::NotAuthenticated => "signed-out",
            Self::InvalidCredentials => "invalid-credentials",
            Self::EmailTaken => "email-taken",
            Self::Validation(_) => "invalid-input",
            Self::NotFound(_) => "not-found",
            Self::TaskLimitReached { .. } => "task-limit",
            Self::FeatureLocked(_) => "feature-locked",
            Self::UnsupportedSchema { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::PasswordHash(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = err.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("request failed: {err}");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
