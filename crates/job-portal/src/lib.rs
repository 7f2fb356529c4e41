//! Lifecycle core of the job portal: accounts and sessions, job postings, applications and
//! two-sided ratings, kept consistent by conditional updates in the entity store.

pub mod config;
pub mod error;
pub mod portal;
pub mod telemetry;
