use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No schedule settings for doctor {0}")]
    NoSettings(Uuid),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ScheduleError {
    /// Failures a later scheduler tick may clear up on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScheduleError::StoreFailure(_))
    }
}

/// Stores may raise a `ScheduleError` through `anyhow`; it comes back out
/// unchanged. Anything else is a store failure.
impl From<anyhow::Error> for ScheduleError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ScheduleError>() {
            Ok(inner) => inner,
            Err(err) => ScheduleError::StoreFailure(format!("{:#}", err)),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::InvalidScope(_) => AppError::BadRequest(err.to_string()),
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::NotFound(msg) => AppError::NotFound(msg),
            ScheduleError::NoSettings(_) => AppError::NotFound(err.to_string()),
            ScheduleError::InvariantViolation(msg) => AppError::Conflict(msg),
            ScheduleError::StoreFailure(msg) => AppError::Database(msg),
        }
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
