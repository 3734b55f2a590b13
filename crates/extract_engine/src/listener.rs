use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use extract_core::Notification;
use extract_logging::extract_trace;
use serde_json::Value;

use crate::EngineSettings;

type Handler = Arc<dyn Fn(Notification) + Send + Sync>;

#[derive(Default)]
struct Slot {
    next_id: u64,
    active: Option<(u64, Handler)>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receives envelopes pushed from the page and routes extraction
/// notifications to a single subscriber.
///
/// Hosts call [`deliver`](Self::deliver) for every inbound message. Holding
/// no state between messages, the listener only forwards.
#[derive(Clone)]
pub struct MessageListener {
    namespace: Arc<str>,
    slot: Arc<Mutex<Slot>>,
}

impl MessageListener {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Arc::from(namespace.into()),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.namespace.clone())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Attaches `handler`, detaching whichever handler was active before.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let mut slot = lock(&self.slot);
        slot.next_id += 1;
        let id = slot.next_id;
        slot.active = Some((id, Arc::new(handler)));
        Subscription {
            id,
            slot: Arc::downgrade(&self.slot),
        }
    }

    pub fn has_subscriber(&self) -> bool {
        lock(&self.slot).active.is_some()
    }

    /// Routes one inbound envelope. Returns whether a subscriber received it.
    pub fn deliver(&self, message: &Value) -> bool {
        let Some(notification) = Notification::from_envelope(&self.namespace, message) else {
            return false;
        };
        // Call outside the lock so a handler may resubscribe.
        let handler = lock(&self.slot)
            .active
            .as_ref()
            .map(|(_, handler)| handler.clone());
        match handler {
            Some(handler) => {
                handler(notification);
                true
            }
            None => {
                extract_trace!("No subscriber for {}", notification.kind());
                false
            }
        }
    }
}

/// Keeps a handler attached; dropping it detaches the handler unless a newer
/// subscription has already replaced it.
pub struct Subscription {
    id: u64,
    slot: Weak<Mutex<Slot>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let mut slot = lock(&slot);
        if slot.active.as_ref().is_some_and(|(id, _)| *id == self.id) {
            slot.active = None;
        }
    }
}
