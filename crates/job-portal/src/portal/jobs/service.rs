use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::domain::{Job, JobAmendment, JobQuery, JobStatus, JobSubmission, Retirement};
use crate::portal::domain::{Identity, JobId, Role};
use crate::portal::error::{EntityKind, PortalError};
use crate::portal::events::{EventSink, PortalEvent};
use crate::portal::store::{EntityStore, RetiredJob};

/// Creates, amends, lists and retires job postings.
pub struct JobService<S> {
    store: Arc<S>,
    events: Arc<dyn EventSink>,
}

impl<S> JobService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    pub fn create_job(
        &self,
        owner: &Identity,
        submission: JobSubmission,
        now: DateTime<Utc>,
    ) -> Result<Job, PortalError> {
        owner.require(Role::Recruiter, "only recruiters can post jobs")?;
        let job = submission.into_job(owner.user_id, now)?;
        let job = self.store.insert_job(job)?;

        info!(job_id = %job.id, owner_id = %job.owner_id, "job created");
        self.events.record(&PortalEvent::JobCreated {
            job_id: job.id,
            owner_id: job.owner_id,
        });
        Ok(job)
    }

    pub fn update_job(
        &self,
        owner: &Identity,
        job_id: &JobId,
        amendment: JobAmendment,
    ) -> Result<Job, PortalError> {
        let job = self.owned_job(owner, job_id)?;
        let changes = amendment.validate(&job)?;
        if changes.is_empty() {
            return Ok(job);
        }

        let job = self.store.amend_job(job_id, &changes)?;
        info!(job_id = %job.id, "job amended");
        self.events.record(&PortalEvent::JobAmended { job_id: job.id });
        Ok(job)
    }

    /// Closes the job and finishes its live applications. Closing a closed job is a no-op;
    /// a deleted job cannot be closed.
    pub fn close_job(&self, owner: &Identity, job_id: &JobId) -> Result<RetiredJob, PortalError> {
        self.owned_job_including_deleted(owner, job_id)?;
        self.retire(job_id, Retirement::Close)
    }

    /// Closes every open job whose deadline is before `now`; returns the jobs it closed.
    pub fn close_expired_jobs(&self, now: DateTime<Utc>) -> Result<Vec<RetiredJob>, PortalError> {
        let expired: Vec<JobId> = self
            .store
            .jobs()?
            .into_iter()
            .filter(|job| job.status == JobStatus::Open && job.deadline < now)
            .map(|job| job.id)
            .collect();

        let mut closed = Vec::with_capacity(expired.len());
        for job_id in expired {
            match self.retire(&job_id, Retirement::Close) {
                Ok(retired) => closed.push(retired),
                // Deleted between the scan and the close.
                Err(PortalError::JobNotOpen { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        if !closed.is_empty() {
            info!(count = closed.len(), "closed jobs past their deadline");
        }
        Ok(closed)
    }

    /// Tombstones the job and deletes its live applications. Repeating it cascades nothing.
    pub fn delete_job(&self, owner: &Identity, job_id: &JobId) -> Result<RetiredJob, PortalError> {
        let job = self.owned_job_including_deleted(owner, job_id)?;
        if job.status == JobStatus::Deleted {
            return Ok(RetiredJob {
                job,
                cascaded: Vec::new(),
            });
        }
        self.retire(job_id, Retirement::Delete)
    }

    /// Visible job by id; deleted jobs read as missing.
    pub fn job(&self, job_id: &JobId) -> Result<Job, PortalError> {
        self.store
            .job(job_id)?
            .filter(|job| job.status != JobStatus::Deleted)
            .ok_or_else(|| PortalError::not_found(EntityKind::Job, job_id))
    }

    /// Job that still takes applications at `now`.
    pub fn open_job(&self, job_id: &JobId, now: DateTime<Utc>) -> Result<Job, PortalError> {
        let job = self.job(job_id)?;
        if !job.accepts_applications_at(now) {
            debug!(job_id = %job.id, status = %job.status, "job is not taking applications");
            return Err(PortalError::JobNotOpen { job_id: job.id });
        }
        Ok(job)
    }

    /// Visible job owned by the caller.
    pub fn owned_job(&self, owner: &Identity, job_id: &JobId) -> Result<Job, PortalError> {
        owner.require(Role::Recruiter, "only recruiters manage jobs")?;
        let job = self.job(job_id)?;
        if job.owner_id != owner.user_id {
            return Err(PortalError::Forbidden("job belongs to another recruiter"));
        }
        Ok(job)
    }

    pub fn list_jobs(&self, viewer: &Identity, query: &JobQuery) -> Result<Vec<Job>, PortalError> {
        let mut query = query.clone();
        if query.mine {
            viewer.require(Role::Recruiter, "only recruiters own jobs")?;
            query.owner_id = Some(viewer.user_id);
        }

        let mut jobs: Vec<Job> = self
            .store
            .jobs()?
            .into_iter()
            .filter(|job| query.matches(job))
            .collect();
        query.sort(&mut jobs);
        Ok(jobs)
    }

    fn owned_job_including_deleted(
        &self,
        owner: &Identity,
        job_id: &JobId,
    ) -> Result<Job, PortalError> {
        owner.require(Role::Recruiter, "only recruiters manage jobs")?;
        let job = self
            .store
            .job(job_id)?
            .ok_or_else(|| PortalError::not_found(EntityKind::Job, job_id))?;
        if job.owner_id != owner.user_id {
            return Err(PortalError::Forbidden("job belongs to another recruiter"));
        }
        Ok(job)
    }

    fn retire(&self, job_id: &JobId, retirement: Retirement) -> Result<RetiredJob, PortalError> {
        let retired = self.store.retire_job(job_id, retirement)?;
        let count = retired.cascaded.len();

        let event = match retirement {
            Retirement::Close => PortalEvent::JobClosed {
                job_id: *job_id,
                finished: count,
            },
            Retirement::Delete => PortalEvent::JobDeleted {
                job_id: *job_id,
                deleted: count,
            },
        };
        info!(
            job_id = %job_id,
            status = %retired.job.status,
            cascaded = count,
            "job retired"
        );
        self.events.record(&event);
        Ok(retired)
    }
}
