/// Volume tracker — owns the authoritative snapshot and the trigger.
///
/// [`VolumeTracker::refresh`] is the single mutation entry point: it
/// queries the snapshot source, classifies the difference against the
/// held snapshot, folds the reported category back in, and dispatches the
/// lifecycle events. Triggers (timer thread or notification forwarder)
/// only ever call `refresh`.
///
/// # Concurrency
///
/// The query/diff/update phase runs under a single `parking_lot` mutex,
/// so a polling timer that re-fires before the previous cycle finished
/// simply queues behind it — overlapping refreshes serialize rather than
/// interleave. Event dispatch happens after the lock is dropped, so
/// subscribers may call back into the tracker (including `release`).
///
/// Trigger threads hold only a `Weak` reference to the tracker internals;
/// after `release` the upgrade fails, which structurally rules out a
/// refresh dispatched into released state.
pub mod events;

use crate::diff::{diff, ChangeSet};
use crate::error::TrackerError;
use crate::model::{Snapshot, VolumeRecord};
use crate::source::SnapshotSource;
use crate::trigger::{self, ActiveTrigger, RefreshTarget, TriggerConfig};
use events::{SubscriberId, SubscriberRegistry, VolumeEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct TrackerState {
    current: Snapshot,
    enabled: bool,
    released: bool,
    trigger_config: TriggerConfig,
    active: Option<ActiveTrigger>,
}

struct TrackerInner {
    source: Arc<dyn SnapshotSource>,
    state: Mutex<TrackerState>,
    subscribers: SubscriberRegistry,
}

/// Tracks the set of volumes attached to the host and notifies
/// subscribers of insertions, removals, and attribute changes.
pub struct VolumeTracker {
    inner: Arc<TrackerInner>,
}

impl VolumeTracker {
    /// Build a tracker over `source`, taking the initial snapshot eagerly.
    ///
    /// Never fails: if the initial query errors, the tracker starts from
    /// an empty snapshot (and the first refresh reports everything visible
    /// as inserted). The trigger is created but NOT started — call
    /// [`VolumeTracker::set_enabled`] to wire it up.
    pub fn new(source: Arc<dyn SnapshotSource>, trigger_config: TriggerConfig) -> Self {
        let current = match source.query() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "initial volume query failed; starting from an empty snapshot");
                Snapshot::new()
            }
        };
        info!(volumes = current.len(), "volume tracker constructed");

        Self {
            inner: Arc::new(TrackerInner {
                source,
                state: Mutex::new(TrackerState {
                    current,
                    enabled: false,
                    released: false,
                    trigger_config,
                    active: None,
                }),
                subscribers: SubscriberRegistry::default(),
            }),
        }
    }

    /// Run one refresh cycle now, regardless of trigger state.
    pub fn refresh(&self) {
        self.inner.refresh_cycle();
    }

    /// Register a callback for every lifecycle event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&VolumeEvent) + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(callback)
    }

    /// Remove a subscription. Returns `true` if it was present.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.unsubscribe(id)
    }

    /// The currently held snapshot, as a plain list.
    pub fn volumes(&self) -> Vec<VolumeRecord> {
        self.inner.state.lock().current.iter().cloned().collect()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    /// Wire (`true`) or unwire (`false`) the trigger.
    ///
    /// Transitioning to the current state is a no-op. Enabling binds the
    /// trigger's resources and surfaces [`TrackerError::Binding`] on
    /// failure, leaving the tracker disabled. Neither direction touches
    /// the snapshot or raises events.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), TrackerError> {
        if enabled {
            self.enable()
        } else {
            self.disable();
            Ok(())
        }
    }

    fn enable(&self) -> Result<(), TrackerError> {
        let mut state = self.inner.state.lock();
        if state.released {
            return Err(TrackerError::Released);
        }
        if state.enabled {
            return Ok(());
        }

        let target: Arc<dyn RefreshTarget> = Arc::clone(&self.inner) as _;
        let active = trigger::start(&state.trigger_config, Arc::downgrade(&target))?;
        state.active = Some(active);
        state.enabled = true;
        info!("volume tracker enabled");
        Ok(())
    }

    fn disable(&self) {
        let active = {
            let mut state = self.inner.state.lock();
            if !state.enabled {
                return;
            }
            state.enabled = false;
            state.active.take()
        };
        // Stop outside the state lock: stopping joins the trigger thread,
        // which may be blocked on that same lock inside a refresh.
        if let Some(active) = active {
            active.stop();
        }
        info!("volume tracker disabled");
    }

    /// Tear the tracker down: stop any active trigger and bar further
    /// refresh dispatch. Idempotent; also invoked from `Drop`.
    pub fn release(&self) {
        let active = {
            let mut state = self.inner.state.lock();
            if state.released {
                return;
            }
            state.released = true;
            state.enabled = false;
            state.active.take()
        };
        if let Some(active) = active {
            active.stop();
        }
        debug!("volume tracker released");
    }
}

impl Drop for VolumeTracker {
    fn drop(&mut self) {
        self.release();
    }
}

impl RefreshTarget for TrackerInner {
    fn refresh(&self) {
        self.refresh_cycle();
    }
}

impl TrackerInner {
    fn refresh_cycle(&self) {
        let events = {
            let mut state = self.state.lock();
            if state.released {
                return;
            }

            // A failed query degrades to "no volumes visible" so a trigger
            // callback can never crash; every known volume then surfaces
            // as removed, and re-surfaces as inserted once the source
            // recovers.
            let fresh = match self.source.query() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "volume query failed; treating as no volumes visible");
                    Snapshot::new()
                }
            };

            let changes = diff(&state.current, &fresh);
            fold_changes(&mut state.current, &changes, fresh);
            into_events(changes)
        };

        // Dispatch outside the lock so subscribers may re-enter.
        for event in &events {
            debug!(volume = %event.record(), "dispatching {} event", event.kind());
            self.subscribers.dispatch(event);
        }
    }
}

/// Fold the reported category back into the stored snapshot.
///
/// Only the reported change is applied; everything else keeps its old
/// record, so whatever the early-stop rule suppressed this cycle is still
/// detectable on the next one:
/// - removal cycle: drop the removed records, keep the rest untouched
///   (a same-cycle insertion fires next refresh);
/// - insertion cycle: add the new records, keep existing ones at their
///   old values (a concurrent attribute change fires next refresh);
/// - change cycle: replace only the reported record (further changed
///   volumes fire one per subsequent refresh);
/// - quiet cycle: adopt the fresh snapshot wholesale (picks up
///   controller-address updates, which are outside deep comparison).
fn fold_changes(current: &mut Snapshot, changes: &ChangeSet, fresh: Snapshot) {
    if !changes.removed.is_empty() {
        for record in &changes.removed {
            current.remove(&record.identifier);
        }
    } else if !changes.inserted.is_empty() {
        for record in &changes.inserted {
            current.insert(record.clone());
        }
    } else if let Some(changed) = &changes.changed {
        current.replace(changed.clone());
    } else {
        *current = fresh;
    }
}

/// Flatten a change set into events, in the fixed order
/// removed → inserted → changed (at most one category is populated).
fn into_events(changes: ChangeSet) -> Vec<VolumeEvent> {
    let mut events: Vec<VolumeEvent> =
        changes.removed.into_iter().map(VolumeEvent::Removed).collect();
    events.extend(changes.inserted.into_iter().map(VolumeEvent::Inserted));
    events.extend(changes.changed.into_iter().map(VolumeEvent::Changed));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(identifier: &str, label: &str) -> VolumeRecord {
        VolumeRecord {
            identifier: identifier.to_owned(),
            label: label.to_owned(),
            filesystem_kind: "NTFS".to_owned(),
            serial_number: 7,
            flags: 0,
            max_component_length: 255,
            mount_path: String::new(),
            controller_address: None,
        }
    }

    fn fixed_source(records: Vec<VolumeRecord>) -> Arc<dyn SnapshotSource> {
        Arc::new(move || -> anyhow::Result<Snapshot> {
            Ok(records.iter().cloned().collect())
        })
    }

    fn polling_config() -> TriggerConfig {
        TriggerConfig::Polling {
            interval: Duration::from_secs(3600),
        }
    }

    #[test]
    fn construction_takes_an_eager_snapshot() {
        let tracker = VolumeTracker::new(
            fixed_source(vec![record("v1", "Data")]),
            polling_config(),
        );
        assert_eq!(tracker.volumes().len(), 1);
    }

    #[test]
    fn construction_survives_a_failing_source() {
        let failing: Arc<dyn SnapshotSource> =
            Arc::new(|| -> anyhow::Result<Snapshot> { anyhow::bail!("enumeration failed") });
        let tracker = VolumeTracker::new(failing, polling_config());
        assert!(tracker.volumes().is_empty());
    }

    #[test]
    fn enable_after_release_is_an_error() {
        let tracker = VolumeTracker::new(fixed_source(vec![]), polling_config());
        tracker.release();
        assert!(matches!(
            tracker.set_enabled(true),
            Err(TrackerError::Released)
        ));
    }

    #[test]
    fn release_is_idempotent() {
        let tracker = VolumeTracker::new(fixed_source(vec![]), polling_config());
        tracker.set_enabled(true).unwrap();
        tracker.set_enabled(false).unwrap();
        tracker.release();
        tracker.release();
        assert!(!tracker.is_enabled());
    }

    #[test]
    fn set_enabled_is_idempotent_per_direction() {
        let tracker = VolumeTracker::new(fixed_source(vec![]), polling_config());
        tracker.set_enabled(true).unwrap();
        tracker.set_enabled(true).unwrap();
        assert!(tracker.is_enabled());
        tracker.set_enabled(false).unwrap();
        tracker.set_enabled(false).unwrap();
        assert!(!tracker.is_enabled());
    }

    #[test]
    fn refresh_after_release_dispatches_nothing() {
        let tracker = VolumeTracker::new(fixed_source(vec![]), polling_config());
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        tracker.subscribe(move |_| {
            hits_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });

        tracker.release();
        // Even a manual refresh is a no-op once released.
        tracker.refresh();
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
