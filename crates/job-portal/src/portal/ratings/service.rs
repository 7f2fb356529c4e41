use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::domain::{validate_value, Rating, RatingCategory, RatingSubmission, RatingWrite};
use crate::portal::domain::{Identity, RatingId};
use crate::portal::error::PortalError;
use crate::portal::events::{EventSink, PortalEvent};
use crate::portal::store::EntityStore;

/// Records one rating per (category, receiver, sender). Eligibility is decided by the
/// application lifecycle before a submission reaches this service.
pub struct RatingService<S> {
    store: Arc<S>,
    events: Arc<dyn EventSink>,
}

impl<S> RatingService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    pub fn submit(
        &self,
        sender: &Identity,
        submission: RatingSubmission,
    ) -> Result<RatingWrite, PortalError> {
        let value = validate_value(submission.value)?;
        sender.require(
            submission.category.rater_role(),
            "this rating category belongs to the other role",
        )?;

        let rating = Rating {
            id: RatingId::generate(),
            category: submission.category,
            receiver_id: submission.receiver_id,
            sender_id: sender.user_id,
            value,
        };
        let write = self.store.upsert_rating(rating)?;

        info!(
            category = %write.rating.category,
            receiver_id = %write.rating.receiver_id,
            created = write.created,
            aggregate = write.aggregate,
            "rating recorded"
        );
        self.events.record(&PortalEvent::RatingRecorded {
            category: write.rating.category,
            created: write.created,
        });
        Ok(write)
    }

    /// The caller's own rating of a receiver, if any.
    pub fn rating_by(
        &self,
        sender: &Identity,
        category: RatingCategory,
        receiver_id: Uuid,
    ) -> Result<Option<Rating>, PortalError> {
        Ok(self.store.rating(category, receiver_id, &sender.user_id)?)
    }
}
