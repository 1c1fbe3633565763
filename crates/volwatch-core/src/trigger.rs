/// Trigger sources — the mechanisms that drive refresh cycles.
///
/// A tracker owns exactly one trigger, chosen at construction and never
/// swapped. Both variants run as a named background thread that holds only
/// a `Weak` handle to the tracker internals: once the tracker is released
/// the upgrade fails and the thread exits on its own, so a stale trigger
/// can never dispatch a refresh into freed state.
///
/// Shutdown uses a dedicated stop channel. Dropping the stop sender wakes
/// the thread's `select!` immediately (disconnect counts as a receive), so
/// `stop()` can join without waiting out a polling interval.
use crate::error::TrackerError;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Something a trigger can drive. Implemented by the tracker internals;
/// tests implement it directly to observe trigger behavior in isolation.
pub(crate) trait RefreshTarget: Send + Sync {
    fn refresh(&self);
}

/// A device-change notification delivered by the embedding environment.
///
/// The discriminants mirror the Windows `WM_DEVICECHANGE` wparam values
/// (`DBT_*`); [`DeviceNotification::from_raw`] decodes them. Embedders on
/// other delivery channels (a management-instrumentation watcher, say) may
/// send any variant — the trigger refreshes on every notification
/// regardless of subtype, and only logs the subtype for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceNotification {
    /// DBT_DEVICEARRIVAL
    Arrival,
    /// DBT_DEVICEQUERYREMOVE
    QueryRemove,
    /// DBT_DEVICEQUERYREMOVEFAILED
    QueryRemoveFailed,
    /// DBT_DEVICEREMOVEPENDING
    RemovePending,
    /// DBT_DEVICEREMOVECOMPLETE
    RemoveComplete,
    /// DBT_DEVTYP-specific event
    DeviceSpecific,
    /// DBT_CUSTOMEVENT
    Custom,
    /// DBT_DEVNODES_CHANGED
    NodesChanged,
    /// Anything else, with the raw code preserved.
    Other(u32),
}

impl DeviceNotification {
    /// Decode a raw `WM_DEVICECHANGE` wparam value.
    pub fn from_raw(code: u32) -> Self {
        match code {
            0x8000 => Self::Arrival,
            0x8001 => Self::QueryRemove,
            0x8002 => Self::QueryRemoveFailed,
            0x8003 => Self::RemovePending,
            0x8004 => Self::RemoveComplete,
            0x8005 => Self::DeviceSpecific,
            0x8006 => Self::Custom,
            0x0007 => Self::NodesChanged,
            other => Self::Other(other),
        }
    }
}

/// Which mechanism drives refresh cycles, chosen once at construction.
#[derive(Clone)]
pub enum TriggerConfig {
    /// Fire `refresh()` on a fixed repeating interval. The interval is
    /// immutable once started; build a new tracker to change it.
    Polling { interval: Duration },
    /// Forward externally delivered device notifications to `refresh()`.
    /// The embedder keeps the sending half and adapts whatever native
    /// channel it owns (window message pump, instrumentation watcher)
    /// into [`DeviceNotification`] values.
    Notification { events: Receiver<DeviceNotification> },
}

/// A started trigger: the background thread plus its stop channel.
///
/// Created by [`start`], torn down by [`ActiveTrigger::stop`] (or by drop,
/// which performs the same shutdown).
pub(crate) struct ActiveTrigger {
    stop_tx: Option<Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ActiveTrigger {
    /// Stop the trigger thread and wait for it to exit.
    ///
    /// Waiting means an in-flight refresh completes before this returns,
    /// so the caller may release resources immediately afterwards. When
    /// called from the trigger's own thread (a subscriber tearing the
    /// tracker down from inside a callback) the join is skipped.
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("trigger thread panicked during shutdown");
            }
        }
    }
}

impl Drop for ActiveTrigger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the configured trigger against `target`.
///
/// Errors are binding failures only (bad parameters, a dead notification
/// channel, thread creation failure); the caller stays Disabled on `Err`.
pub(crate) fn start(
    config: &TriggerConfig,
    target: std::sync::Weak<dyn RefreshTarget>,
) -> Result<ActiveTrigger, TrackerError> {
    match config {
        TriggerConfig::Polling { interval } => start_polling(*interval, target),
        TriggerConfig::Notification { events } => start_notification(events.clone(), target),
    }
}

fn start_polling(
    interval: Duration,
    target: std::sync::Weak<dyn RefreshTarget>,
) -> Result<ActiveTrigger, TrackerError> {
    if interval.is_zero() {
        return Err(TrackerError::Binding(
            "polling interval must be positive".to_owned(),
        ));
    }

    let (stop_tx, stop_rx) = bounded::<()>(0);
    let thread = thread::Builder::new()
        .name("volwatch-poll".to_owned())
        .spawn(move || {
            debug!(?interval, "polling trigger started");
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let Some(target) = target.upgrade() else { break };
                        target.refresh();
                    }
                    recv(stop_rx) -> _ => break,
                }
            }
            debug!("polling trigger stopped");
        })
        .map_err(|e| TrackerError::Binding(format!("failed to spawn polling thread: {e}")))?;

    Ok(ActiveTrigger {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}

fn start_notification(
    events: Receiver<DeviceNotification>,
    target: std::sync::Weak<dyn RefreshTarget>,
) -> Result<ActiveTrigger, TrackerError> {
    // Probe the channel so a dead one fails the bind instead of silently
    // producing a trigger that can never fire. A notification that was
    // already queued is not lost — it is handed to the thread.
    let pending = match events.try_recv() {
        Ok(notification) => Some(notification),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            return Err(TrackerError::Binding(
                "notification channel is disconnected".to_owned(),
            ));
        }
    };

    let (stop_tx, stop_rx) = bounded::<()>(0);
    let thread = thread::Builder::new()
        .name("volwatch-notify".to_owned())
        .spawn(move || {
            debug!("notification trigger started");
            if let Some(notification) = pending {
                forward(notification, &target);
            }
            loop {
                select! {
                    recv(events) -> msg => match msg {
                        Ok(notification) => {
                            if !forward(notification, &target) {
                                break;
                            }
                        }
                        // Embedder dropped the sending half; nothing more
                        // will ever arrive.
                        Err(_) => break,
                    },
                    recv(stop_rx) -> _ => break,
                }
            }
            debug!("notification trigger stopped");
        })
        .map_err(|e| TrackerError::Binding(format!("failed to spawn notification thread: {e}")))?;

    Ok(ActiveTrigger {
        stop_tx: Some(stop_tx),
        thread: Some(thread),
    })
}

/// Refresh on every notification, whatever the subtype. No subtype gate
/// (arrival / remove-complete / nodes-changed only): the "change" subtypes
/// fire in too many unrelated situations to filter on, and the detector
/// already makes a redundant refresh a no-op. Returns `false` once the
/// target is gone.
fn forward(
    notification: DeviceNotification,
    target: &std::sync::Weak<dyn RefreshTarget>,
) -> bool {
    debug!(?notification, "device notification");
    match target.upgrade() {
        Some(target) => {
            target.refresh();
            true
        }
        None => false,
    }
}
