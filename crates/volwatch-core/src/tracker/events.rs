/// Lifecycle events and the subscriber registry.
///
/// Subscribers register a callback and receive every event the tracker
/// emits, in registration order. Dispatch iterates over a snapshot of the
/// registry taken under a short lock, so a subscriber that adds or removes
/// subscriptions from inside its own callback cannot corrupt iteration —
/// such edits simply take effect from the next event onward.
use crate::model::VolumeRecord;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A volume lifecycle notification, carrying the affected record at its
/// current (post-change) field values.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "volume", rename_all = "snake_case")]
pub enum VolumeEvent {
    Inserted(VolumeRecord),
    Removed(VolumeRecord),
    Changed(VolumeRecord),
}

impl VolumeEvent {
    /// The record the event is about.
    pub fn record(&self) -> &VolumeRecord {
        match self {
            VolumeEvent::Inserted(r) | VolumeEvent::Removed(r) | VolumeEvent::Changed(r) => r,
        }
    }

    /// Short label for logs and text output.
    pub fn kind(&self) -> &'static str {
        match self {
            VolumeEvent::Inserted(_) => "inserted",
            VolumeEvent::Removed(_) => "removed",
            VolumeEvent::Changed(_) => "changed",
        }
    }
}

/// Opaque handle identifying one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Arc<dyn Fn(&VolumeEvent) + Send + Sync>;

/// Observer list mapping subscriber ids to callbacks.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    entries: Mutex<Vec<(SubscriberId, Callback)>>,
}

impl SubscriberRegistry {
    pub(crate) fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&VolumeEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscription. Returns `true` if it was present.
    pub(crate) fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invoke every current subscriber with `event`, in registration order.
    pub(crate) fn dispatch(&self, event: &VolumeEvent) {
        // Clone the callback list out of the lock before invoking anything:
        // callbacks may subscribe/unsubscribe re-entrantly.
        let callbacks: Vec<Callback> = self
            .entries
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }
}
