use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use job_portal::portal::{EntityStore, EventSink, MetricsEventSink, Portal, PortalEvent};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Counts portal events through the installed recorder and traces them at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ServiceEventSink {
    metrics: MetricsEventSink,
}

impl EventSink for ServiceEventSink {
    fn record(&self, event: &PortalEvent) {
        debug!(event = event.name(), detail = ?event, "portal event");
        self.metrics.record(event);
    }
}

/// Periodically closes open jobs whose deadline has passed.
pub(crate) fn spawn_deadline_sweep<S>(portal: Arc<Portal<S>>, every: Duration) -> JoinHandle<()>
where
    S: EntityStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match portal.jobs().close_expired_jobs(Utc::now()) {
                Ok(closed) if !closed.is_empty() => {
                    debug!(count = closed.len(), "deadline sweep closed jobs");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "deadline sweep failed"),
            }
        }
    })
}
