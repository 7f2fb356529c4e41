use std::sync::Arc;

use super::accounts::{AuthService, TokenIssuer};
use super::applications::ApplicationService;
use super::domain::Identity;
use super::error::PortalError;
use super::events::EventSink;
use super::jobs::JobService;
use super::ratings::{RatingService, RatingSubmission, RatingWrite};
use super::store::{EntityStore, InMemoryEntityStore};
use crate::config::AuthConfig;

/// One handle over every lifecycle service, sharing a store and an event sink.
pub struct Portal<S> {
    store: Arc<S>,
    auth: AuthService<S>,
    jobs: Arc<JobService<S>>,
    applications: ApplicationService<S>,
    ratings: RatingService<S>,
}

impl<S> Portal<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, tokens: TokenIssuer, events: Arc<dyn EventSink>) -> Self {
        let jobs = Arc::new(JobService::new(Arc::clone(&store), Arc::clone(&events)));
        Self {
            auth: AuthService::new(Arc::clone(&store), tokens, Arc::clone(&events)),
            applications: ApplicationService::new(
                Arc::clone(&store),
                Arc::clone(&jobs),
                Arc::clone(&events),
            ),
            ratings: RatingService::new(Arc::clone(&store), events),
            jobs,
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn auth(&self) -> &AuthService<S> {
        &self.auth
    }

    pub fn jobs(&self) -> &JobService<S> {
        &self.jobs
    }

    pub fn applications(&self) -> &ApplicationService<S> {
        &self.applications
    }

    pub fn ratings(&self) -> &RatingService<S> {
        &self.ratings
    }

    /// Checks the sender may rate the receiver, then records the rating.
    pub fn rate(
        &self,
        sender: &Identity,
        submission: RatingSubmission,
    ) -> Result<RatingWrite, PortalError> {
        self.applications.rating_eligibility(
            sender,
            submission.category,
            submission.receiver_id,
        )?;
        self.ratings.submit(sender, submission)
    }
}

impl Portal<InMemoryEntityStore> {
    pub fn in_memory(auth: &AuthConfig, events: Arc<dyn EventSink>) -> Self {
        Self::new(
            Arc::new(InMemoryEntityStore::new()),
            TokenIssuer::from_config(auth),
            events,
        )
    }
}
