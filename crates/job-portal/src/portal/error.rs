use std::fmt;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::applications::ApplicationStatus;
use super::domain::{JobId, UserId};
use super::store::{JobCounter, StoreError, UniqueKey};
use super::validation::ValidationError;

/// Stable tag reported alongside every portal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    CapacityExceeded,
    ApplicationLimitReached,
    DuplicateApplication,
    DuplicateEmail,
    DuplicateRating,
    InvalidCredentials,
    InvalidToken,
    UserNotFound,
    NotFound,
    InvalidTransition,
    JobNotOpen,
    Forbidden,
    NotEligible,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::CapacityExceeded => "capacity_exceeded",
            ErrorKind::ApplicationLimitReached => "application_limit_reached",
            ErrorKind::DuplicateApplication => "duplicate_application",
            ErrorKind::DuplicateEmail => "duplicate_email",
            ErrorKind::DuplicateRating => "duplicate_rating",
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::InvalidToken => "invalid_token",
            ErrorKind::UserNotFound => "user_not_found",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::JobNotOpen => "job_not_open",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotEligible => "not_eligible",
            ErrorKind::Internal => "internal",
        }
    }

    /// Saturation errors may succeed later once other requests change the job's counters.
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::CapacityExceeded | ErrorKind::ApplicationLimitReached
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Profile,
    Job,
    Application,
    Rating,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::User => "user",
            EntityKind::Profile => "profile",
            EntityKind::Job => "job",
            EntityKind::Application => "application",
            EntityKind::Rating => "rating",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("job {job_id} has no open positions left")]
    CapacityExceeded { job_id: JobId },
    #[error("job {job_id} is not accepting more applications")]
    ApplicationLimitReached { job_id: JobId },
    #[error("an active application to job {job_id} already exists")]
    DuplicateApplication { job_id: JobId },
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("this rating already exists")]
    DuplicateRating,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("session token is invalid, expired or revoked")]
    InvalidToken,
    #[error("user {0} no longer exists")]
    UserNotFound(UserId),
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("job {job_id} is not open")]
    JobNotOpen { job_id: JobId },
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotEligible(&'static str),
    #[error("credential processing failed: {0}")]
    Credential(String),
    #[error(transparent)]
    Store(StoreError),
}

impl PortalError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::Validation(_) => ErrorKind::ValidationError,
            PortalError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            PortalError::ApplicationLimitReached { .. } => ErrorKind::ApplicationLimitReached,
            PortalError::DuplicateApplication { .. } => ErrorKind::DuplicateApplication,
            PortalError::DuplicateEmail => ErrorKind::DuplicateEmail,
            PortalError::DuplicateRating => ErrorKind::DuplicateRating,
            PortalError::InvalidCredentials => ErrorKind::InvalidCredentials,
            PortalError::InvalidToken => ErrorKind::InvalidToken,
            PortalError::UserNotFound(_) => ErrorKind::UserNotFound,
            PortalError::NotFound { .. } => ErrorKind::NotFound,
            PortalError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            PortalError::JobNotOpen { .. } => ErrorKind::JobNotOpen,
            PortalError::Forbidden(_) => ErrorKind::Forbidden,
            PortalError::NotEligible(_) => ErrorKind::NotEligible,
            PortalError::Credential(_) | PortalError::Store(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::CapacityExceeded
            | ErrorKind::ApplicationLimitReached
            | ErrorKind::DuplicateApplication
            | ErrorKind::DuplicateEmail
            | ErrorKind::DuplicateRating
            | ErrorKind::InvalidTransition
            | ErrorKind::JobNotOpen => StatusCode::CONFLICT,
            ErrorKind::InvalidCredentials | ErrorKind::InvalidToken | ErrorKind::UserNotFound => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::Forbidden | ErrorKind::NotEligible => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(UniqueKey::UserEmail) => PortalError::DuplicateEmail,
            StoreError::Conflict(UniqueKey::LiveApplication { job_id, .. }) => {
                PortalError::DuplicateApplication { job_id }
            }
            StoreError::Conflict(UniqueKey::Rating { .. }) => PortalError::DuplicateRating,
            StoreError::Missing { entity, id } => PortalError::NotFound { entity, id },
            StoreError::LimitReached {
                job_id,
                counter: JobCounter::ActiveApplications,
            } => PortalError::ApplicationLimitReached { job_id },
            StoreError::LimitReached {
                job_id,
                counter: JobCounter::AcceptedCandidates,
            } => PortalError::CapacityExceeded { job_id },
            StoreError::LimitBelowCount { counter, current } => {
                PortalError::Validation(ValidationError::new(
                    counter.limit_field(),
                    format!("cannot be lower than the current count of {current}"),
                ))
            }
            StoreError::JobNotOpen(job_id) => PortalError::JobNotOpen { job_id },
            other => PortalError::Store(other),
        }
    }
}

impl From<JsonRejection> for PortalError {
    fn from(rejection: JsonRejection) -> Self {
        PortalError::Validation(ValidationError::new("body", rejection.body_text()))
    }
}

impl From<PathRejection> for PortalError {
    fn from(rejection: PathRejection) -> Self {
        PortalError::Validation(ValidationError::new("path", rejection.body_text()))
    }
}

impl From<QueryRejection> for PortalError {
    fn from(rejection: QueryRejection) -> Self {
        PortalError::Validation(ValidationError::new("query", rejection.body_text()))
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "portal request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
