/// Data model for the volume tracker.
///
/// Re-exports the per-volume record type and the snapshot collection.
pub mod record;
pub mod snapshot;

pub use record::{ControllerAddress, VolumeRecord};
pub use snapshot::Snapshot;
