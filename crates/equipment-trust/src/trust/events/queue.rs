use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, info, warn};

use super::super::cache::ResultCache;
use super::super::store::TrustStore;
use super::{TrustEvent, TrustEventSink, TrustEventsService};

/// Build a bounded queue and the worker that drains it.
pub fn event_queue(capacity: usize) -> (EventQueue, EventWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventQueue {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        EventWorker { rx },
    )
}

/// Producer side. A full or closed queue drops the event; the next trigger
/// recomputes from scratch, so nothing is lost permanently.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<TrustEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventQueue {
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TrustEventSink for EventQueue {
    fn emit(&self, event: TrustEvent) {
        let (event, reason) = match self.tx.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(event)) => (event, "queue full"),
            Err(TrySendError::Closed(event)) => (event, "queue closed"),
        };
        self.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(event = event.name(), reason, "trust event dropped");
    }
}

/// Consumer side; run it on the runtime for the lifetime of the process.
pub struct EventWorker {
    rx: mpsc::Receiver<TrustEvent>,
}

impl EventWorker {
    /// Dispatch events until every [`EventQueue`] handle is dropped.
    pub async fn run<S, C>(mut self, events: Arc<TrustEventsService<S, C>>)
    where
        S: TrustStore + 'static,
        C: ResultCache + 'static,
    {
        while let Some(event) = self.rx.recv().await {
            let name = event.name();
            let events = Arc::clone(&events);
            if let Err(join_error) = tokio::task::spawn_blocking(move || events.dispatch(event)).await
            {
                error!(event = name, error = %join_error, "trust event handler aborted");
            }
        }
        info!("trust event queue closed");
    }
}
