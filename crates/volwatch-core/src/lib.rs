/// VolWatch Core — volume tracking and change detection.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (CLI, GUI,
/// service embedding).
///
/// # Modules
///
/// - [`model`] — Volume records and the snapshot collection.
/// - [`diff`] — Pure change detector between two snapshots.
/// - [`source`] — The snapshot-source seam the tracker queries through.
/// - [`tracker`] — The orchestrator: snapshot ownership, lifecycle, events.
/// - [`trigger`] — Polling and notification-driven refresh triggers.
/// - [`platform`] — Windows volume enumeration (cfg-gated).
/// - [`error`] — Lifecycle error types.
pub mod diff;
pub mod error;
pub mod model;
pub mod platform;
pub mod source;
pub mod tracker;
pub mod trigger;

pub use diff::{diff, ChangeSet};
pub use error::TrackerError;
pub use model::{ControllerAddress, Snapshot, VolumeRecord};
pub use source::SnapshotSource;
pub use tracker::events::{SubscriberId, VolumeEvent};
pub use tracker::VolumeTracker;
pub use trigger::{DeviceNotification, TriggerConfig};
