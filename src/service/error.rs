use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::jobmodel::{ApplicationStatus, JobStatus},
};

/// Caller-facing category of a failed lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Conflict,
    Internal,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("No application from worker {1} on job {0}")]
    ApplicationNotFound(Uuid, Uuid),

    #[error("User {0} is not authorized to perform this action on job {1}")]
    Forbidden(Uuid, Uuid),

    #[error("Job {0} is {1:?}; cannot {2}")]
    InvalidJobState(Uuid, JobStatus, &'static str),

    #[error("Application of worker {1} on job {0} is already {2:?}")]
    InvalidApplicationState(Uuid, Uuid, ApplicationStatus),

    #[error("Worker {1} has already applied to job {0}")]
    AlreadyApplied(Uuid, Uuid),

    #[error("Job {0} was taken by a concurrent request")]
    ConcurrentTransition(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::JobNotFound(_) | ServiceError::ApplicationNotFound(_, _) => {
                ErrorKind::NotFound
            }
            ServiceError::Forbidden(_, _) => ErrorKind::Forbidden,
            ServiceError::InvalidJobState(_, _, _)
            | ServiceError::InvalidApplicationState(_, _, _)
            | ServiceError::Validation(_) => ErrorKind::InvalidState,
            ServiceError::AlreadyApplied(_, _) | ServiceError::ConcurrentTransition(_) => {
                ErrorKind::Conflict
            }
            ServiceError::Notification(_) | ServiceError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error.kind() {
            ErrorKind::NotFound => HttpError::not_found(error.to_string()),
            ErrorKind::Forbidden => HttpError::forbidden(error.to_string()),
            ErrorKind::InvalidState => HttpError::bad_request(error.to_string()),
            ErrorKind::Conflict => HttpError::conflict(error.to_string()),
            ErrorKind::Internal => {
                tracing::error!("Lifecycle operation failed: {}", error);
                HttpError::server_error(error.to_string())
            }
        }
    }
}
