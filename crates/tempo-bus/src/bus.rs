use std::sync::{Arc, RwLock};

use tempo_core::RecordId;
use tracing::{debug, warn};

use crate::event::TimerEvent;

/// A subscriber to timer lifecycle events.
///
/// Handlers run synchronously on the publishing thread; returning an error
/// never aborts delivery to the remaining handlers.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: TimerEvent, id: RecordId) -> anyhow::Result<()>;
}

impl<F> EventHandler for F
where
    F: Fn(TimerEvent, RecordId) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: TimerEvent, id: RecordId) -> anyhow::Result<()> {
        self(event, id)
    }
}

/// Multi-subscriber notifier with in-registration-order, best-effort delivery.
///
/// Designed to be cheaply shareable via Arc — one EventBus instance per
/// repository, handed to every interested component.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().expect("subscriber list poisoned");
        handlers.push(handler);
        debug!(total = handlers.len(), "event subscriber registered");
    }

    /// Deliver `event` to every subscriber in registration order.
    ///
    /// The handler list is snapshotted first, so a handler that subscribes
    /// re-entrantly cannot deadlock the iteration; it simply misses the
    /// in-flight event.
    pub fn publish(&self, event: TimerEvent, id: RecordId) {
        let snapshot: Vec<Arc<dyn EventHandler>> = {
            self.handlers
                .read()
                .expect("subscriber list poisoned")
                .clone()
        };
        debug!(%event, id, subscribers = snapshot.len(), "publishing event");
        for (idx, handler) in snapshot.iter().enumerate() {
            if let Err(e) = handler.on_event(event, id) {
                warn!(%event, id, subscriber = idx, "event handler failed: {e:#}");
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
