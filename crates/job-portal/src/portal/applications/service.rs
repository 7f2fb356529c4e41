use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::domain::{
    validate_joining_date, Application, ApplicationFilter, ApplicationQuery, ApplicationStatus,
    ApplicationSubmission, StatusUpdate,
};
use crate::portal::domain::{ApplicationId, Identity, JobId, Role, UserId};
use crate::portal::error::{EntityKind, PortalError};
use crate::portal::events::{EventSink, PortalEvent};
use crate::portal::jobs::JobService;
use crate::portal::ratings::RatingCategory;
use crate::portal::store::{EntityStore, JobCounter, StatusTransition, StoreError, TransitionReceipt};
use crate::portal::validation::ValidationError;

/// Drives applications through their status machine while the store keeps job counters in step.
pub struct ApplicationService<S> {
    store: Arc<S>,
    jobs: Arc<JobService<S>>,
    events: Arc<dyn EventSink>,
}

impl<S> ApplicationService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, jobs: Arc<JobService<S>>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            jobs,
            events,
        }
    }

    pub fn apply(
        &self,
        applicant: &Identity,
        job_id: &JobId,
        submission: ApplicationSubmission,
        now: DateTime<Utc>,
    ) -> Result<Application, PortalError> {
        applicant.require(Role::Applicant, "only applicants can apply")?;
        submission.validate()?;
        let job = self.jobs.open_job(job_id, now)?;

        let application = Application {
            id: ApplicationId::generate(),
            applicant_id: applicant.user_id,
            recruiter_id: job.owner_id,
            job_id: job.id,
            status: ApplicationStatus::Applied,
            application_date: now,
            joining_date: None,
            statement_of_purpose: submission.statement_of_purpose.trim().to_string(),
        };

        match self.store.insert_application(application) {
            Ok(application) => {
                info!(
                    application_id = %application.id,
                    job_id = %application.job_id,
                    applicant_id = %application.applicant_id,
                    "application submitted"
                );
                self.events.record(&PortalEvent::ApplicationCreated {
                    application_id: application.id,
                    job_id: application.job_id,
                });
                Ok(application)
            }
            Err(StoreError::LimitReached { job_id, .. }) => {
                warn!(%job_id, "job reached its applicant limit");
                self.events
                    .record(&PortalEvent::ApplicationLimitReached { job_id });
                Err(PortalError::ApplicationLimitReached { job_id })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Moves an application to `update.status`. Recruiters shortlist, accept and reject;
    /// applicants withdraw by cancelling.
    pub fn update_status(
        &self,
        actor: &Identity,
        application_id: &ApplicationId,
        update: StatusUpdate,
    ) -> Result<TransitionReceipt, PortalError> {
        let current = self.application(actor, application_id)?;
        let to = update.status;

        if to == ApplicationStatus::Cancelled {
            if actor.user_id != current.applicant_id {
                return Err(PortalError::Forbidden(
                    "only the applicant can withdraw an application",
                ));
            }
        } else if actor.user_id != current.recruiter_id {
            return Err(PortalError::Forbidden(
                "only the job's recruiter can review an application",
            ));
        }

        let plan = current
            .status
            .plan(to)
            .ok_or(PortalError::InvalidTransition {
                from: current.status,
                to,
            })?;

        let joining_date = match (to, update.joining_date) {
            (ApplicationStatus::Accepted, Some(date)) => {
                validate_joining_date(&current, date)?;
                Some(date)
            }
            (ApplicationStatus::Accepted, None) => {
                return Err(ValidationError::new("joining_date", "is required to accept").into())
            }
            (_, Some(_)) => {
                return Err(ValidationError::new(
                    "joining_date",
                    "can only be set when accepting",
                )
                .into())
            }
            (_, None) => None,
        };

        let transition = StatusTransition {
            application_id: current.id,
            expected: current.status,
            plan,
            joining_date,
        };

        match self.store.transition_application(&transition) {
            Ok(receipt) => {
                info!(
                    application_id = %current.id,
                    from = %current.status,
                    to = %to,
                    cancelled = receipt.cancelled.len(),
                    "application transitioned"
                );
                self.events.record(&PortalEvent::ApplicationTransitioned {
                    application_id: current.id,
                    from: current.status,
                    to,
                    cancelled: receipt.cancelled.len(),
                });
                Ok(receipt)
            }
            Err(StoreError::StatusMismatch { found, .. }) => {
                Err(PortalError::InvalidTransition { from: found, to })
            }
            Err(StoreError::LimitReached {
                job_id,
                counter: JobCounter::AcceptedCandidates,
            }) => {
                warn!(%job_id, application_id = %current.id, "job has no open positions");
                self.events.record(&PortalEvent::CapacityExceeded { job_id });
                Err(PortalError::CapacityExceeded { job_id })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn shortlist(
        &self,
        recruiter: &Identity,
        application_id: &ApplicationId,
    ) -> Result<TransitionReceipt, PortalError> {
        self.update_status(recruiter, application_id, status(ApplicationStatus::Shortlisted))
    }

    pub fn accept(
        &self,
        recruiter: &Identity,
        application_id: &ApplicationId,
        joining_date: DateTime<Utc>,
    ) -> Result<TransitionReceipt, PortalError> {
        let update = StatusUpdate {
            status: ApplicationStatus::Accepted,
            joining_date: Some(joining_date),
        };
        self.update_status(recruiter, application_id, update)
    }

    pub fn reject(
        &self,
        recruiter: &Identity,
        application_id: &ApplicationId,
    ) -> Result<TransitionReceipt, PortalError> {
        self.update_status(recruiter, application_id, status(ApplicationStatus::Rejected))
    }

    pub fn withdraw(
        &self,
        applicant: &Identity,
        application_id: &ApplicationId,
    ) -> Result<TransitionReceipt, PortalError> {
        self.update_status(applicant, application_id, status(ApplicationStatus::Cancelled))
    }

    pub fn set_joining_date(
        &self,
        recruiter: &Identity,
        application_id: &ApplicationId,
        joining_date: DateTime<Utc>,
    ) -> Result<Application, PortalError> {
        let current = self.application(recruiter, application_id)?;
        if recruiter.user_id != current.recruiter_id {
            return Err(PortalError::Forbidden(
                "only the job's recruiter can set a joining date",
            ));
        }
        validate_joining_date(&current, joining_date)?;

        match self.store.set_joining_date(application_id, joining_date) {
            Ok(application) => Ok(application),
            Err(StoreError::StatusMismatch { .. }) => Err(ValidationError::new(
                "joining_date",
                "can only be set on an accepted application",
            )
            .into()),
            Err(err) => Err(err.into()),
        }
    }

    /// Applicants see their own applications; recruiters see those made to their jobs.
    pub fn list_applications(
        &self,
        viewer: &Identity,
        query: &ApplicationQuery,
    ) -> Result<Vec<Application>, PortalError> {
        let mut filter = ApplicationFilter {
            job_id: query.job_id,
            status: query.status,
            ..ApplicationFilter::default()
        };
        match viewer.role {
            Role::Applicant => filter.applicant_id = Some(viewer.user_id),
            Role::Recruiter => filter.recruiter_id = Some(viewer.user_id),
        }
        Ok(self.store.applications(&filter)?)
    }

    pub fn job_applications(
        &self,
        recruiter: &Identity,
        job_id: &JobId,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, PortalError> {
        self.jobs.owned_job(recruiter, job_id)?;
        let filter = ApplicationFilter {
            job_id: Some(*job_id),
            status,
            ..ApplicationFilter::default()
        };
        Ok(self.store.applications(&filter)?)
    }

    /// Application visible to either of its two parties.
    pub fn application(
        &self,
        viewer: &Identity,
        application_id: &ApplicationId,
    ) -> Result<Application, PortalError> {
        let application = self
            .store
            .application(application_id)?
            .ok_or_else(|| PortalError::not_found(EntityKind::Application, application_id))?;
        if viewer.user_id != application.applicant_id && viewer.user_id != application.recruiter_id
        {
            return Err(PortalError::Forbidden(
                "application belongs to other users",
            ));
        }
        Ok(application)
    }

    /// A rating needs an accepted or finished application linking sender and receiver.
    pub fn rating_eligibility(
        &self,
        sender: &Identity,
        category: RatingCategory,
        receiver_id: Uuid,
    ) -> Result<(), PortalError> {
        sender.require(
            category.rater_role(),
            "this rating category belongs to the other role",
        )?;

        let filter = match category {
            RatingCategory::Job => ApplicationFilter {
                applicant_id: Some(sender.user_id),
                job_id: Some(JobId(receiver_id)),
                ..ApplicationFilter::default()
            },
            RatingCategory::Applicant => ApplicationFilter {
                applicant_id: Some(UserId(receiver_id)),
                recruiter_id: Some(sender.user_id),
                ..ApplicationFilter::default()
            },
        };

        let eligible = self.store.applications(&filter)?.iter().any(|application| {
            matches!(
                application.status,
                ApplicationStatus::Accepted | ApplicationStatus::Finished
            )
        });
        if !eligible {
            return Err(PortalError::NotEligible(
                "an accepted or finished application is required to rate",
            ));
        }
        Ok(())
    }
}

fn status(status: ApplicationStatus) -> StatusUpdate {
    StatusUpdate {
        status,
        joining_date: None,
    }
}
