/// Change detection between two volume snapshots.
///
/// [`diff`] classifies the difference between the previously known
/// snapshot and a fresh one into at most ONE of three categories per
/// call: removals, insertions, or a single attribute change. The
/// categories are evaluated in a strict priority order with an early
/// stop, so a refresh cycle never reports more than one kind of event:
///
/// 1. **Removals dominate.** Any volume that disappeared ends the scan —
///    an insertion seen in the same cycle is presumed to be the
///    reconnection half of a disk reshuffle and is picked up on the next
///    refresh instead of being conflated with the removal.
/// 2. **Insertions next.** Only evaluated when nothing was removed.
/// 3. **Attribute changes last.** Only evaluated when the identifier sets
///    match; the first record whose attributes deep-compare unequal is
///    reported (as its *current* version) and scanning stops. Further
///    simultaneous changes surface on later refreshes once the stored
///    snapshot catches up.
///
/// Pure and deterministic — no I/O, no clock, no state.
use crate::model::{Snapshot, VolumeRecord};

/// The classified difference between two snapshots.
///
/// At most one of the three fields is ever populated (see module docs).
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Volumes present before but absent now, in `previous` iteration order.
    pub removed: Vec<VolumeRecord>,
    /// Volumes absent before but present now, in `current` iteration order.
    pub inserted: Vec<VolumeRecord>,
    /// The first volume whose attributes changed, at its current values.
    pub changed: Option<VolumeRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty() && self.changed.is_none()
    }
}

/// Classify the difference between `previous` and `current`.
///
/// Membership is decided by identity (identifier only); attribute changes
/// by deep comparison (controller address excluded). See the module docs
/// for the priority and early-stop rules.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> ChangeSet {
    // 1st: volumes that went away. A non-empty removal set ends the cycle.
    let removed: Vec<VolumeRecord> = previous
        .iter()
        .filter(|record| !current.contains_id(&record.identifier))
        .cloned()
        .collect();
    if !removed.is_empty() {
        return ChangeSet {
            removed,
            ..ChangeSet::default()
        };
    }

    // 2nd: volumes that appeared. A non-empty insertion set ends the cycle.
    let inserted: Vec<VolumeRecord> = current
        .iter()
        .filter(|record| !previous.contains_id(&record.identifier))
        .cloned()
        .collect();
    if !inserted.is_empty() {
        return ChangeSet {
            inserted,
            ..ChangeSet::default()
        };
    }

    // 3rd: identifier sets match — report the first attribute difference.
    let changed = previous.iter().find_map(|old| {
        current
            .get(&old.identifier)
            .filter(|new| old.attributes_differ(new))
            .cloned()
    });

    ChangeSet {
        changed,
        ..ChangeSet::default()
    }
}
