//! Named lifecycle events handed to an optional telemetry sink.

use super::applications::ApplicationStatus;
use super::domain::{ApplicationId, JobId, Role, UserId};
use super::ratings::RatingCategory;

#[derive(Debug, Clone, PartialEq)]
pub enum PortalEvent {
    UserSignedUp { user_id: UserId, role: Role },
    SignupRolledBack { user_id: UserId },
    LoginSucceeded { user_id: UserId },
    LoginRejected,
    LoggedOut { user_id: UserId },
    JobCreated { job_id: JobId, owner_id: UserId },
    JobAmended { job_id: JobId },
    JobClosed { job_id: JobId, finished: usize },
    JobDeleted { job_id: JobId, deleted: usize },
    ApplicationCreated { application_id: ApplicationId, job_id: JobId },
    ApplicationLimitReached { job_id: JobId },
    ApplicationTransitioned {
        application_id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
        cancelled: usize,
    },
    CapacityExceeded { job_id: JobId },
    RatingRecorded { category: RatingCategory, created: bool },
}

impl PortalEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            PortalEvent::UserSignedUp { .. } => "user_signed_up",
            PortalEvent::SignupRolledBack { .. } => "signup_rolled_back",
            PortalEvent::LoginSucceeded { .. } => "login_succeeded",
            PortalEvent::LoginRejected => "login_rejected",
            PortalEvent::LoggedOut { .. } => "logged_out",
            PortalEvent::JobCreated { .. } => "job_created",
            PortalEvent::JobAmended { .. } => "job_amended",
            PortalEvent::JobClosed { .. } => "job_closed",
            PortalEvent::JobDeleted { .. } => "job_deleted",
            PortalEvent::ApplicationCreated { .. } => "application_created",
            PortalEvent::ApplicationLimitReached { .. } => "application_limit_reached",
            PortalEvent::ApplicationTransitioned { .. } => "application_transitioned",
            PortalEvent::CapacityExceeded { .. } => "capacity_exceeded",
            PortalEvent::RatingRecorded { .. } => "rating_recorded",
        }
    }
}

/// Outbound telemetry hook. Lifecycle services behave the same whichever sink is installed.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &PortalEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &PortalEvent) {}
}

/// Counts events through the `metrics` facade; a no-op until a recorder is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsEventSink;

impl EventSink for MetricsEventSink {
    fn record(&self, event: &PortalEvent) {
        metrics::counter!("portal_events_total", "event" => event.name()).increment(1);
        if let PortalEvent::ApplicationTransitioned { to, .. } = event {
            metrics::counter!("portal_application_transitions_total", "to" => to.label())
                .increment(1);
        }
    }
}
