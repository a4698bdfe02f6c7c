use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Error raised by handlers and services.
///
/// Every variant maps to one HTTP status and is rendered as the standard
/// error envelope `{ statusCode, message, success: false, errors }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Unique-key violation reported by a store that has no SQLSTATE to carry it.
#[derive(Debug, thiserror::Error)]
#[error("duplicate {0}")]
#[cfg_attr(not(test), allow(dead_code))]
pub struct UniqueViolation(pub String);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
    success: bool,
    errors: Vec<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            ApiError::Validation(errors) => ("Validation failed".to_string(), errors),
            ApiError::Internal(detail) => {
                error!(error = %detail, "internal error");
                ("Internal server error".to_string(), Vec::new())
            }
            other => (other.to_string(), Vec::new()),
        };

        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
            success: false,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

/// Translates untyped failures from repositories and collaborators.
///
/// A PostgreSQL unique violation (or a [`UniqueViolation`]) anywhere in the
/// chain becomes a Conflict, anything else is an Internal error.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                return ApiError::Conflict(format!("Duplicate value violates {constraint}"));
            }
        }
        if let Some(dup) = err.downcast_ref::<UniqueViolation>() {
            return ApiError::Conflict(format!("Duplicate value violates unique {}", dup.0));
        }
        ApiError::Internal(format!("{err:#}"))
    }
}
