/// The complete set of volume records observed at one instant.
///
/// Membership is keyed on the record `identifier` — a snapshot never holds
/// two records for the same volume. Iteration follows insertion order,
/// which is stable within one snapshot but NOT guaranteed stable across
/// snapshots, since every query builds a fresh one.
use crate::model::VolumeRecord;

#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    records: Vec<VolumeRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, rejecting duplicates of an already-present
    /// identifier. Returns `true` if the record was added.
    pub fn insert(&mut self, record: VolumeRecord) -> bool {
        if self.contains_id(&record.identifier) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Remove the record with the given identifier, returning it if present.
    pub fn remove(&mut self, identifier: &str) -> Option<VolumeRecord> {
        let pos = self
            .records
            .iter()
            .position(|r| r.identifier == identifier)?;
        Some(self.records.remove(pos))
    }

    /// Replace the record sharing `record`'s identifier with `record`.
    /// Inserts it if no such record exists.
    pub fn replace(&mut self, record: VolumeRecord) {
        match self
            .records
            .iter_mut()
            .find(|r| r.identifier == record.identifier)
        {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&VolumeRecord> {
        self.records.iter().find(|r| r.identifier == identifier)
    }

    pub fn contains_id(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VolumeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<VolumeRecord> for Snapshot {
    /// Collect records into a snapshot, silently dropping duplicate
    /// identifiers (first occurrence wins — matching the enumeration
    /// behavior of the platform sources).
    fn from_iter<I: IntoIterator<Item = VolumeRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}
