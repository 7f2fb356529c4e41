//! Job portal lifecycle: accounts, jobs, applications and ratings over one entity store.

pub mod accounts;
pub mod applications;
pub mod domain;
pub mod error;
pub mod events;
pub mod facade;
pub mod jobs;
pub mod ratings;
pub mod router;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use accounts::{AuthService, TokenIssuer};
pub use applications::{ApplicationService, ApplicationStatus};
pub use domain::{ApplicationId, Identity, JobId, RatingId, Role, UserId};
pub use error::{EntityKind, ErrorKind, PortalError};
pub use events::{EventSink, MetricsEventSink, NoopEventSink, PortalEvent};
pub use facade::Portal;
pub use jobs::JobService;
pub use ratings::RatingService;
pub use router::portal_router;
pub use store::{EntityStore, InMemoryEntityStore, StoreError};
pub use validation::ValidationError;
