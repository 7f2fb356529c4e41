use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::portal::accounts::{
    ApplicantProfile, Profile, RecruiterProfile, TokenIssuer, User,
};
use crate::portal::applications::{
    Application, ApplicationFilter, ApplicationStatus, ApplicationSubmission, StatusUpdate,
};
use crate::portal::domain::{ApplicationId, Identity, JobId, Role, UserId};
use crate::portal::events::{EventSink, PortalEvent};
use crate::portal::facade::Portal;
use crate::portal::jobs::{Job, JobChanges, JobSubmission, JobType, Retirement};
use crate::portal::ratings::{Rating, RatingCategory, RatingWrite, UNRATED};
use crate::portal::store::{
    EntityStore, InMemoryEntityStore, RetiredJob, StatusTransition, StoreError,
    TransitionReceipt,
};

pub(super) const TEST_SECRET: &str = "portal-test-secret";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

#[derive(Default)]
pub(super) struct RecordingEventSink {
    events: Mutex<Vec<PortalEvent>>,
}

impl RecordingEventSink {
    pub(super) fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .map(PortalEvent::name)
            .collect()
    }

    pub(super) fn events(&self) -> Vec<PortalEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventSink for RecordingEventSink {
    fn record(&self, event: &PortalEvent) {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event.clone());
    }
}

pub(super) fn token_issuer() -> TokenIssuer {
    TokenIssuer::new(TEST_SECRET, Duration::hours(1))
}

pub(super) struct Harness<S = InMemoryEntityStore> {
    pub(super) portal: Arc<Portal<S>>,
    pub(super) store: Arc<S>,
    pub(super) events: Arc<RecordingEventSink>,
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(InMemoryEntityStore::new()))
}

pub(super) fn harness_with<S>(store: Arc<S>) -> Harness<S>
where
    S: EntityStore + 'static,
{
    let events = Arc::new(RecordingEventSink::default());
    let sink: Arc<dyn EventSink> = events.clone();
    let portal = Arc::new(Portal::new(store.clone(), token_issuer(), sink));
    Harness {
        portal,
        store,
        events,
    }
}

/// Inserts an account directly, skipping password hashing.
pub(super) fn seed_user<S: EntityStore>(store: &S, role: Role, name: &str) -> Identity {
    let id = UserId::generate();
    store
        .insert_user(User {
            id,
            email: format!("{name}-{id}@example.com"),
            password_hash: "unused".to_string(),
            role,
        })
        .expect("insert user");

    let profile = match role {
        Role::Recruiter => Profile::Recruiter(RecruiterProfile {
            user_id: id,
            name: name.to_string(),
            contact_number: None,
            bio: None,
        }),
        Role::Applicant => Profile::Applicant(ApplicantProfile {
            user_id: id,
            name: name.to_string(),
            education: Vec::new(),
            skills: Vec::new(),
            rating: UNRATED,
            resume: None,
            profile_image: None,
        }),
    };
    store.insert_profile(profile).expect("insert profile");
    Identity::new(id, role)
}

pub(super) fn recruiter<S: EntityStore>(harness: &Harness<S>) -> Identity {
    seed_user(harness.store.as_ref(), Role::Recruiter, "recruiter")
}

pub(super) fn applicant<S: EntityStore>(harness: &Harness<S>) -> Identity {
    seed_user(harness.store.as_ref(), Role::Applicant, "applicant")
}

pub(super) fn job_submission(max_applicants: u32, max_positions: u32) -> JobSubmission {
    JobSubmission {
        title: "Backend Engineer".to_string(),
        max_applicants: f64::from(max_applicants),
        max_positions: f64::from(max_positions),
        posting_date: None,
        deadline: now() + Duration::days(30),
        skillsets: vec!["rust".to_string(), "sql".to_string()],
        job_type: JobType::FullTime,
        duration: 6.0,
        salary: 90_000.0,
    }
}

pub(super) fn post_job<S>(
    harness: &Harness<S>,
    owner: &Identity,
    max_applicants: u32,
    max_positions: u32,
) -> Job
where
    S: EntityStore + 'static,
{
    harness
        .portal
        .jobs()
        .create_job(owner, job_submission(max_applicants, max_positions), now())
        .expect("create job")
}

pub(super) fn sop(words: usize) -> ApplicationSubmission {
    ApplicationSubmission {
        statement_of_purpose: vec!["motivated"; words].join(" "),
    }
}

pub(super) fn apply<S>(harness: &Harness<S>, applicant: &Identity, job: &Job) -> Application
where
    S: EntityStore + 'static,
{
    harness
        .portal
        .applications()
        .apply(applicant, &job.id, sop(12), now())
        .expect("apply")
}

pub(super) fn joining() -> DateTime<Utc> {
    now() + Duration::days(45)
}

pub(super) fn stored_job<S: EntityStore>(harness: &Harness<S>, job_id: &JobId) -> Job {
    harness
        .store
        .job(job_id)
        .expect("store available")
        .expect("job exists")
}

pub(super) fn stored_application<S: EntityStore>(
    harness: &Harness<S>,
    application_id: &ApplicationId,
) -> Application {
    harness
        .store
        .application(application_id)
        .expect("store available")
        .expect("application exists")
}

pub(super) fn status(status: ApplicationStatus) -> StatusUpdate {
    StatusUpdate {
        status,
        joining_date: None,
    }
}

/// Header value for a token signed with the harness secret.
pub(super) fn bearer(identity: &Identity) -> String {
    let issued = token_issuer()
        .issue(identity.user_id, identity.role, Utc::now())
        .expect("issue token");
    format!("Bearer {}", issued.token)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Delegates to the in-memory store but refuses every profile write.
#[derive(Default)]
pub(super) struct ProfileRejectingStore {
    pub(super) inner: InMemoryEntityStore,
}

impl EntityStore for ProfileRejectingStore {
    fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.inner.insert_user(user)
    }

    fn remove_user(&self, id: &UserId) -> Result<(), StoreError> {
        self.inner.remove_user(id)
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.user(id)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.inner.user_by_email(email)
    }

    fn insert_profile(&self, _profile: Profile) -> Result<Profile, StoreError> {
        Err(StoreError::Unavailable("profile table offline".to_string()))
    }

    fn replace_profile(&self, _profile: Profile) -> Result<Profile, StoreError> {
        Err(StoreError::Unavailable("profile table offline".to_string()))
    }

    fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, StoreError> {
        self.inner.profile(user_id)
    }

    fn revoke_session(
        &self,
        token_id: Uuid,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.revoke_session(token_id, expires_at, now)
    }

    fn is_session_revoked(&self, token_id: Uuid) -> Result<bool, StoreError> {
        self.inner.is_session_revoked(token_id)
    }

    fn insert_job(&self, job: Job) -> Result<Job, StoreError> {
        self.inner.insert_job(job)
    }

    fn job(&self, id: &JobId) -> Result<Option<Job>, StoreError> {
        self.inner.job(id)
    }

    fn jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.inner.jobs()
    }

    fn amend_job(&self, id: &JobId, changes: &JobChanges) -> Result<Job, StoreError> {
        self.inner.amend_job(id, changes)
    }

    fn retire_job(&self, id: &JobId, retirement: Retirement) -> Result<RetiredJob, StoreError> {
        self.inner.retire_job(id, retirement)
    }

    fn insert_application(&self, application: Application) -> Result<Application, StoreError> {
        self.inner.insert_application(application)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        self.inner.application(id)
    }

    fn applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, StoreError> {
        self.inner.applications(filter)
    }

    fn transition_application(
        &self,
        transition: &StatusTransition,
    ) -> Result<TransitionReceipt, StoreError> {
        self.inner.transition_application(transition)
    }

    fn set_joining_date(
        &self,
        id: &ApplicationId,
        joining_date: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        self.inner.set_joining_date(id, joining_date)
    }

    fn upsert_rating(&self, rating: Rating) -> Result<RatingWrite, StoreError> {
        self.inner.upsert_rating(rating)
    }

    fn rating(
        &self,
        category: RatingCategory,
        receiver_id: Uuid,
        sender_id: &UserId,
    ) -> Result<Option<Rating>, StoreError> {
        self.inner.rating(category, receiver_id, sender_id)
    }
}
