//! Application status machine and the counter bookkeeping that goes with it.

mod domain;
mod service;

pub use domain::{
    Application, ApplicationFilter, ApplicationQuery, ApplicationStatus, ApplicationSubmission,
    CounterDelta, StatusUpdate, TransitionPlan,
};
pub use service::ApplicationService;
