use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::portal::domain::{ApplicationId, JobId, UserId};
use crate::portal::validation::{ensure_word_limit, ValidationError, MAX_STATEMENT_WORDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Accepted,
    Rejected,
    Deleted,
    Cancelled,
    Finished,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Deleted => "deleted",
            ApplicationStatus::Cancelled => "cancelled",
            ApplicationStatus::Finished => "finished",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Rejected
                | ApplicationStatus::Deleted
                | ApplicationStatus::Cancelled
                | ApplicationStatus::Finished
        )
    }

    /// Statuses that occupy a slot in `Job::active_applications`. Accepted applications stay
    /// counted alongside `accepted_candidates`.
    pub const fn counts_as_active(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Applied
                | ApplicationStatus::Shortlisted
                | ApplicationStatus::Accepted
        )
    }

    /// Counter effects of moving from `self` to `to`, or `None` when the move is not a user
    /// transition. `Deleted` and `Finished` are reached only through job cascades.
    pub const fn plan(self, to: ApplicationStatus) -> Option<TransitionPlan> {
        use ApplicationStatus::*;

        let plan = match (self, to) {
            (Applied, Shortlisted) => TransitionPlan::quiet(Shortlisted),
            (Applied | Shortlisted, Accepted) => TransitionPlan {
                to: Accepted,
                active: CounterDelta::Unchanged,
                accepted: CounterDelta::Increment,
                cancel_competing: true,
            },
            (Applied | Shortlisted, Rejected) => TransitionPlan::release(Rejected),
            (Applied | Shortlisted, Cancelled) => TransitionPlan::release(Cancelled),
            (Accepted, Cancelled) => TransitionPlan {
                to: Cancelled,
                active: CounterDelta::Decrement,
                accepted: CounterDelta::Decrement,
                cancel_competing: false,
            },
            _ => return None,
        };
        Some(plan)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDelta {
    Increment,
    Decrement,
    Unchanged,
}

/// Everything the store must apply atomically for one status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub to: ApplicationStatus,
    pub active: CounterDelta,
    pub accepted: CounterDelta,
    /// Cancel the applicant's other live applications to the same job.
    pub cancel_competing: bool,
}

impl TransitionPlan {
    const fn quiet(to: ApplicationStatus) -> Self {
        Self {
            to,
            active: CounterDelta::Unchanged,
            accepted: CounterDelta::Unchanged,
            cancel_competing: false,
        }
    }

    const fn release(to: ApplicationStatus) -> Self {
        Self {
            to,
            active: CounterDelta::Decrement,
            accepted: CounterDelta::Unchanged,
            cancel_competing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: UserId,
    pub recruiter_id: UserId,
    pub job_id: JobId,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joining_date: Option<DateTime<Utc>>,
    pub statement_of_purpose: String,
}

impl Application {
    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default, alias = "sop")]
    pub statement_of_purpose: String,
}

impl ApplicationSubmission {
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        ensure_word_limit(
            "statement_of_purpose",
            &self.statement_of_purpose,
            MAX_STATEMENT_WORDS,
        )
    }
}

/// Status change requested through the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub joining_date: Option<DateTime<Utc>>,
}

pub(crate) fn validate_joining_date(
    application: &Application,
    joining_date: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if joining_date < application.application_date {
        return Err(ValidationError::new(
            "joining_date",
            "must not be earlier than the application date",
        ));
    }
    Ok(())
}

/// Caller-facing listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationQuery {
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub job_id: Option<JobId>,
}

/// Store-level selection; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub applicant_id: Option<UserId>,
    pub recruiter_id: Option<UserId>,
    pub job_id: Option<JobId>,
    pub status: Option<ApplicationStatus>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        self.applicant_id
            .map_or(true, |id| application.applicant_id == id)
            && self
                .recruiter_id
                .map_or(true, |id| application.recruiter_id == id)
            && self.job_id.map_or(true, |id| application.job_id == id)
            && self.status.map_or(true, |status| application.status == status)
    }
}
