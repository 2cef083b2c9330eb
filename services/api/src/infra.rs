use equipment_trust::trust::{
    EventQueue, NotifierError, ReviewInvitation, ReviewNotifier, TrustEvent, TrustEventSink,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) events: EventQueue,
}

/// Stands in for the SMS/email gateway until one is wired up.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier;

impl ReviewNotifier for LoggingNotifier {
    fn notify(&self, invitation: &ReviewInvitation) -> Result<(), NotifierError> {
        info!(
            request_id = %invitation.request.id,
            lead_id = %invitation.lead.id,
            listing_id = %invitation.listing.id,
            owner_id = %invitation.owner.id,
            "review invitation sent"
        );
        Ok(())
    }
}

/// Holds emitted events until the caller drains and dispatches them.
#[derive(Default)]
pub(crate) struct BufferedSink {
    events: Mutex<Vec<TrustEvent>>,
}

impl BufferedSink {
    pub(crate) fn drain(&self) -> Vec<TrustEvent> {
        std::mem::take(&mut *self.events.lock().expect("sink mutex poisoned"))
    }
}

impl TrustEventSink for BufferedSink {
    fn emit(&self, event: TrustEvent) {
        self.events.lock().expect("sink mutex poisoned").push(event);
    }
}
