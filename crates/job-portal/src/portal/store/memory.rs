use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    EntityStore, JobCounter, RetiredJob, StatusTransition, StoreError, TransitionReceipt,
    UniqueKey,
};
use crate::portal::accounts::{normalize_email, Profile, User};
use crate::portal::applications::{
    Application, ApplicationFilter, ApplicationStatus, CounterDelta,
};
use crate::portal::domain::{ApplicationId, JobId, UserId};
use crate::portal::error::EntityKind;
use crate::portal::jobs::{Job, JobChanges, JobStatus, Retirement};
use crate::portal::ratings::{mean_rating, Rating, RatingCategory, RatingWrite};

type RatingKey = (RatingCategory, Uuid, UserId);

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    profiles: HashMap<UserId, Profile>,
    revoked_sessions: HashMap<Uuid, DateTime<Utc>>,
    jobs: HashMap<JobId, Job>,
    applications: HashMap<ApplicationId, Application>,
    ratings: HashMap<RatingKey, Rating>,
}

impl Tables {
    fn job(&self, id: &JobId) -> Result<&Job, StoreError> {
        self.jobs
            .get(id)
            .ok_or_else(|| StoreError::missing(EntityKind::Job, id))
    }

    fn application(&self, id: &ApplicationId) -> Result<&Application, StoreError> {
        self.applications
            .get(id)
            .ok_or_else(|| StoreError::missing(EntityKind::Application, id))
    }

    fn live_applications_for<'a>(
        &'a self,
        applicant_id: UserId,
        job_id: JobId,
    ) -> impl Iterator<Item = &'a Application> + 'a {
        self.applications.values().filter(move |application| {
            application.applicant_id == applicant_id
                && application.job_id == job_id
                && application.is_live()
        })
    }

    fn refresh_aggregate(&mut self, category: RatingCategory, receiver_id: Uuid) -> f32 {
        let aggregate = mean_rating(
            self.ratings
                .values()
                .filter(|rating| rating.category == category && rating.receiver_id == receiver_id)
                .map(|rating| rating.value),
        );

        match category {
            RatingCategory::Job => {
                if let Some(job) = self.jobs.get_mut(&JobId(receiver_id)) {
                    job.rating = aggregate;
                }
            }
            RatingCategory::Applicant => {
                if let Some(Profile::Applicant(profile)) =
                    self.profiles.get_mut(&UserId(receiver_id))
                {
                    profile.rating = aggregate;
                }
            }
        }
        aggregate
    }
}

fn apply_delta(
    value: u32,
    delta: CounterDelta,
    job_id: JobId,
    counter: JobCounter,
) -> Result<u32, StoreError> {
    match delta {
        CounterDelta::Unchanged => Ok(value),
        CounterDelta::Increment => Ok(value.saturating_add(1)),
        CounterDelta::Decrement => value
            .checked_sub(1)
            .ok_or(StoreError::CounterUnderflow { job_id, counter }),
    }
}

/// Process-local store. Each primitive runs inside one critical section and validates every
/// condition before its first write, so a failure leaves the tables untouched.
#[derive(Default)]
pub struct InMemoryEntityStore {
    tables: Mutex<Tables>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("entity store lock poisoned".to_string()))
    }

    /// Panics while holding the lock.
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _tables = self.tables.lock();
        panic!("poisoning the entity store");
    }

    /// Inserts a row without the live-pair check, moving the job counters as `status` implies.
    #[cfg(test)]
    pub(crate) fn seed_application(&self, application: Application) {
        let mut tables = self.tables.lock().expect("entity store poisoned");
        if let Some(job) = tables.jobs.get_mut(&application.job_id) {
            if application.status.counts_as_active() {
                job.active_applications += 1;
            }
            if application.status == ApplicationStatus::Accepted {
                job.accepted_candidates += 1;
            }
        }
        tables.applications.insert(application.id, application);
    }
}

impl EntityStore for InMemoryEntityStore {
    fn insert_user(&self, mut user: User) -> Result<User, StoreError> {
        let mut tables = self.lock()?;
        user.email = normalize_email(&user.email);

        if tables.emails.contains_key(&user.email) {
            return Err(StoreError::Conflict(UniqueKey::UserEmail));
        }
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(UniqueKey::PrimaryKey(user.id.to_string())));
        }

        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn remove_user(&self, id: &UserId) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let user = tables
            .users
            .remove(id)
            .ok_or_else(|| StoreError::missing(EntityKind::User, id))?;
        tables.emails.remove(&user.email);
        tables.profiles.remove(id);
        Ok(())
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .emails
            .get(&normalize_email(email))
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    fn insert_profile(&self, profile: Profile) -> Result<Profile, StoreError> {
        let mut tables = self.lock()?;
        let user_id = profile.user_id();

        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::missing(EntityKind::User, user_id));
        }
        if tables.profiles.contains_key(&user_id) {
            return Err(StoreError::Conflict(UniqueKey::PrimaryKey(user_id.to_string())));
        }

        tables.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    fn replace_profile(&self, mut profile: Profile) -> Result<Profile, StoreError> {
        let mut tables = self.lock()?;
        let user_id = profile.user_id();
        let current = tables
            .profiles
            .get(&user_id)
            .ok_or_else(|| StoreError::missing(EntityKind::Profile, user_id))?;

        // The aggregate rating is owned by rating upserts.
        if let (Profile::Applicant(next), Profile::Applicant(stored)) = (&mut profile, current) {
            next.rating = stored.rating;
        }

        tables.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.lock()?.profiles.get(user_id).cloned())
    }

    fn revoke_session(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.revoked_sessions.retain(|_, expiry| *expiry > now);
        tables.revoked_sessions.insert(token_id, expires_at);
        Ok(())
    }

    fn is_session_revoked(&self, token_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.revoked_sessions.contains_key(&token_id))
    }

    fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        let mut tables = self.lock()?;
        if tables.jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(UniqueKey::PrimaryKey(job.id.to_string())));
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.jobs.get(id).cloned())
    }

    fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.lock()?.jobs.values().cloned().collect())
    }

    fn amend_job(&self, id: &JobId, changes: &JobChanges) -> Result<Job, StoreError> {
        let mut tables = self.lock()?;
        let current = tables.job(id)?;

        if current.status != JobStatus::Open {
            return Err(StoreError::JobNotOpen(*id));
        }
        if let Some(limit) = changes.max_applicants {
            if limit < current.active_applications {
                return Err(StoreError::LimitBelowCount {
                    counter: JobCounter::ActiveApplications,
                    current: current.active_applications,
                });
            }
        }
        if let Some(limit) = changes.max_positions {
            if limit < current.accepted_candidates {
                return Err(StoreError::LimitBelowCount {
                    counter: JobCounter::AcceptedCandidates,
                    current: current.accepted_candidates,
                });
            }
        }

        let mut job = current.clone();
        if let Some(limit) = changes.max_applicants {
            job.max_applicants = limit;
        }
        if let Some(limit) = changes.max_positions {
            job.max_positions = limit;
        }
        if let Some(deadline) = changes.deadline {
            job.deadline = deadline;
        }

        tables.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    fn retire_job(&self, id: &JobId, retirement: Retirement) -> Result<RetiredJob, StoreError> {
        let mut tables = self.lock()?;
        let current = tables.job(id)?;
        let target = retirement.job_status();

        if current.status == target {
            return Ok(RetiredJob {
                job: current.clone(),
                cascaded: Vec::new(),
            });
        }
        if current.status == JobStatus::Deleted {
            return Err(StoreError::JobNotOpen(*id));
        }

        let mut job = current.clone();
        job.status = target;

        let cascade_status = retirement.cascade_status();
        let mut cascaded = Vec::new();
        for application in tables.applications.values_mut() {
            if application.job_id == *id && application.is_live() {
                application.status = cascade_status;
                cascaded.push(application.id);
            }
        }
        cascaded.sort();

        tables.jobs.insert(job.id, job.clone());
        Ok(RetiredJob { job, cascaded })
    }

    fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let job = tables.job(&application.job_id)?;

        if job.status != JobStatus::Open {
            return Err(StoreError::JobNotOpen(job.id));
        }
        if tables.applications.contains_key(&application.id) {
            return Err(StoreError::Conflict(UniqueKey::PrimaryKey(
                application.id.to_string(),
            )));
        }
        if tables
            .live_applications_for(application.applicant_id, application.job_id)
            .next()
            .is_some()
        {
            return Err(StoreError::Conflict(UniqueKey::LiveApplication {
                applicant_id: application.applicant_id,
                job_id: application.job_id,
            }));
        }
        if job.active_applications >= job.max_applicants {
            return Err(StoreError::LimitReached {
                job_id: job.id,
                counter: JobCounter::ActiveApplications,
            });
        }

        let job_id = job.id;
        if let Some(job) = tables.jobs.get_mut(&job_id) {
            job.active_applications += 1;
        }
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, StoreError> {
        let tables = self.lock()?;
        let mut applications: Vec<Application> = tables
            .applications
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        applications.sort_by(|a, b| {
            a.application_date
                .cmp(&b.application_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(applications)
    }

    fn transition_application(
        &self,
        transition: &StatusTransition,
    ) -> Result<TransitionReceipt, StoreError> {
        let mut tables = self.lock()?;
        let current = tables.application(&transition.application_id)?;

        if current.status != transition.expected {
            return Err(StoreError::StatusMismatch {
                application_id: current.id,
                expected: transition.expected,
                found: current.status,
            });
        }

        let plan = transition.plan;
        let job = tables.job(&current.job_id)?;
        let job_id = job.id;

        if plan.accepted == CounterDelta::Increment && job.accepted_candidates >= job.max_positions
        {
            return Err(StoreError::LimitReached {
                job_id,
                counter: JobCounter::AcceptedCandidates,
            });
        }
        let mut active = apply_delta(
            job.active_applications,
            plan.active,
            job_id,
            JobCounter::ActiveApplications,
        )?;
        let mut accepted = apply_delta(
            job.accepted_candidates,
            plan.accepted,
            job_id,
            JobCounter::AcceptedCandidates,
        )?;

        // Empty while live-pair uniqueness holds; rows that bypassed it are still released.
        let mut competing = Vec::new();
        if plan.cancel_competing {
            for other in tables.live_applications_for(current.applicant_id, current.job_id) {
                if other.id == current.id {
                    continue;
                }
                if other.status.counts_as_active() {
                    active = apply_delta(
                        active,
                        CounterDelta::Decrement,
                        job_id,
                        JobCounter::ActiveApplications,
                    )?;
                }
                if other.status == ApplicationStatus::Accepted {
                    accepted = apply_delta(
                        accepted,
                        CounterDelta::Decrement,
                        job_id,
                        JobCounter::AcceptedCandidates,
                    )?;
                }
                competing.push(other.id);
            }
            competing.sort();
        }

        let mut application = current.clone();
        application.status = plan.to;
        if let Some(joining_date) = transition.joining_date {
            application.joining_date = Some(joining_date);
        }

        let mut job = job.clone();
        job.active_applications = active;
        job.accepted_candidates = accepted;

        for id in &competing {
            if let Some(other) = tables.applications.get_mut(id) {
                other.status = ApplicationStatus::Cancelled;
            }
        }
        tables
            .applications
            .insert(application.id, application.clone());
        tables.jobs.insert(job_id, job.clone());

        Ok(TransitionReceipt {
            application,
            job,
            cancelled: competing,
        })
    }

    fn set_joining_date(
        &self,
        id: &ApplicationId,
        joining_date: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let mut tables = self.lock()?;
        let current = tables.application(id)?;

        if current.status != ApplicationStatus::Accepted {
            return Err(StoreError::StatusMismatch {
                application_id: *id,
                expected: ApplicationStatus::Accepted,
                found: current.status,
            });
        }

        let mut application = current.clone();
        application.joining_date = Some(joining_date);
        tables.applications.insert(*id, application.clone());
        Ok(application)
    }

    fn upsert_rating(&self, rating: Rating) -> Result<RatingWrite, StoreError> {
        let mut tables = self.lock()?;

        let receiver_known = match rating.category {
            RatingCategory::Job => tables.jobs.contains_key(&JobId(rating.receiver_id)),
            RatingCategory::Applicant => matches!(
                tables.profiles.get(&UserId(rating.receiver_id)),
                Some(Profile::Applicant(_))
            ),
        };
        if !receiver_known {
            let entity = match rating.category {
                RatingCategory::Job => EntityKind::Job,
                RatingCategory::Applicant => EntityKind::Profile,
            };
            return Err(StoreError::missing(entity, rating.receiver_id));
        }

        let key = (rating.category, rating.receiver_id, rating.sender_id);
        let (stored, created) = match tables.ratings.get(&key) {
            Some(existing) => (
                Rating {
                    id: existing.id,
                    ..rating
                },
                false,
            ),
            None => {
                if tables.ratings.values().any(|other| other.id == rating.id) {
                    return Err(StoreError::Conflict(UniqueKey::PrimaryKey(
                        rating.id.to_string(),
                    )));
                }
                (rating, true)
            }
        };

        tables.ratings.insert(key, stored.clone());
        let aggregate = tables.refresh_aggregate(stored.category, stored.receiver_id);

        Ok(RatingWrite {
            rating: stored,
            created,
            aggregate,
        })
    }

    fn rating(
        &self,
        category: RatingCategory,
        receiver_id: Uuid,
        sender_id: &UserId,
    ) -> Result<Option<Rating>, StoreError> {
        Ok(self
            .lock()?
            .ratings
            .get(&(category, receiver_id, *sender_id))
            .cloned())
    }
}
