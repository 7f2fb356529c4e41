//! Job postings: validation, listing and retirement cascades.

mod domain;
mod service;

pub use domain::{
    Job, JobAmendment, JobChanges, JobQuery, JobSort, JobStatus, JobSubmission, JobType,
    Retirement,
};
pub use service::JobService;
