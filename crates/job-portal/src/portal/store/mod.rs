//! Entity store contract. Every method is one atomic step: conditional counter updates,
//! status compare-and-swap and uniqueness constraints are decided inside the store so no
//! caller ever performs a read-then-write on shared state.

mod memory;

pub use memory::InMemoryEntityStore;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::accounts::{Profile, User};
use super::applications::{Application, ApplicationFilter, ApplicationStatus, TransitionPlan};
use super::domain::{ApplicationId, JobId, UserId};
use super::error::EntityKind;
use super::jobs::{Job, JobChanges, Retirement};
use super::ratings::{Rating, RatingCategory, RatingWrite};

pub trait EntityStore: Send + Sync {
    /// Fails with `Conflict(UserEmail)` when the normalized email is taken.
    fn insert_user(&self, user: User) -> Result<User, StoreError>;
    /// Physical delete, reserved for rolling back a signup whose profile could not be stored.
    fn remove_user(&self, id: &UserId) -> Result<(), StoreError>;
    fn user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError>;
    fn replace_profile(&self, profile: Profile) -> Result<Profile, StoreError>;
    fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, StoreError>;

    /// Records a revoked token until `expires_at`; entries already expired at `now` are pruned.
    fn revoke_session(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    fn is_session_revoked(&self, token_id: Uuid) -> Result<bool, StoreError>;

    fn insert_job(&self, job: Job) -> Result<Job, StoreError>;
    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError>;
    fn jobs(&self) -> Result<Vec<Job>, StoreError>;
    /// Applies new limits only while they still cover the live counters.
    fn amend_job(&self, id: &JobId, changes: &JobChanges) -> Result<Job, StoreError>;
    /// Moves the job to its terminal status and cascades every non-terminal application.
    /// Re-running it on an already retired job changes nothing.
    fn retire_job(&self, id: &JobId, retirement: Retirement) -> Result<RetiredJob, StoreError>;

    /// Checks the job is open, the (applicant, job) pair has no live application and
    /// `active_applications < max_applicants`, then increments the counter and inserts.
    fn insert_application(&self, application: Application) -> Result<Application, StoreError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, StoreError>;
    /// Compare-and-swap on the application's status together with the job counter deltas
    /// and competing-application cancellations described by the plan.
    fn transition_application(
        &self,
        transition: &StatusTransition,
    ) -> Result<TransitionReceipt, StoreError>;
    fn set_joining_date(
        &self,
        id: &ApplicationId,
        joining_date: DateTime<Utc>,
    ) -> Result<Application, StoreError>;

    /// Inserts or overwrites the rating keyed by (category, receiver, sender) and refreshes
    /// the receiver's aggregate rating in the same step.
    fn upsert_rating(&self, rating: Rating) -> Result<RatingWrite, StoreError>;
    fn rating(
        &self,
        category: RatingCategory,
        receiver_id: Uuid,
        sender_id: &UserId,
    ) -> Result<Option<Rating>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct StatusTransition {
    pub application_id: ApplicationId,
    pub expected: ApplicationStatus,
    pub plan: TransitionPlan,
    pub joining_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionReceipt {
    pub application: Application,
    pub job: Job,
    pub cancelled: Vec<ApplicationId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetiredJob {
    pub job: Job,
    pub cascaded: Vec<ApplicationId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCounter {
    ActiveApplications,
    AcceptedCandidates,
}

impl JobCounter {
    /// Job field bounding this counter.
    pub const fn limit_field(self) -> &'static str {
        match self {
            JobCounter::ActiveApplications => "max_applicants",
            JobCounter::AcceptedCandidates => "max_positions",
        }
    }
}

impl fmt::Display for JobCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobCounter::ActiveApplications => f.write_str("active_applications"),
            JobCounter::AcceptedCandidates => f.write_str("accepted_candidates"),
        }
    }
}

/// Uniqueness constraints declared by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueKey {
    UserEmail,
    LiveApplication { applicant_id: UserId, job_id: JobId },
    Rating {
        category: RatingCategory,
        receiver_id: Uuid,
        sender_id: UserId,
    },
    PrimaryKey(String),
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueKey::UserEmail => f.write_str("user email"),
            UniqueKey::LiveApplication {
                applicant_id,
                job_id,
            } => write!(f, "live application ({applicant_id}, {job_id})"),
            UniqueKey::Rating {
                category,
                receiver_id,
                sender_id,
            } => write!(f, "rating ({category}, {receiver_id}, {sender_id})"),
            UniqueKey::PrimaryKey(id) => write!(f, "primary key {id}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(UniqueKey),
    #[error("{entity} {id} not found")]
    Missing { entity: EntityKind, id: String },
    #[error("job {job_id} reached its {counter} limit")]
    LimitReached { job_id: JobId, counter: JobCounter },
    #[error("{counter} is already at {current}")]
    LimitBelowCount { counter: JobCounter, current: u32 },
    #[error("job {job_id} would drop {counter} below zero")]
    CounterUnderflow { job_id: JobId, counter: JobCounter },
    #[error("application {application_id} is {found}, expected {expected}")]
    StatusMismatch {
        application_id: ApplicationId,
        expected: ApplicationStatus,
        found: ApplicationStatus,
    },
    #[error("job {0} is not open")]
    JobNotOpen(JobId),
    #[error("entity store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn missing(entity: EntityKind, id: impl ToString) -> Self {
        Self::Missing {
            entity,
            id: id.to_string(),
        }
    }
}
