/// Immutable description of one volume at one point in time.
///
/// Records are produced fresh on every snapshot query and never mutated
/// in place. Two comparisons exist and must not be conflated:
///
/// - **Identity** ([`VolumeRecord::same_identity`]) uses only `identifier`
///   and decides set membership — the same volume keeps the same
///   identifier across label changes, remounts, and reshuffles.
/// - **Deep** ([`VolumeRecord::attributes_differ`]) compares the observable
///   attribute fields and decides whether a "changed" event fires.
use serde::Serialize;

/// Controller (SCSI) addressing for a volume: bus, port, and target id.
///
/// Resolution is best-effort and fails atomically — a record either
/// carries the full triple or `None`, never a partially-filled address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ControllerAddress {
    pub bus: u32,
    pub port: u16,
    pub target_id: u16,
}

/// Snapshot of a single volume's attributes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VolumeRecord {
    /// Opaque stable string naming the volume — its identity key.
    /// On Windows this is the volume GUID path.
    pub identifier: String,
    /// Human-readable volume label; may change over the volume's life.
    pub label: String,
    /// Filesystem type name (e.g. "NTFS", "exFAT").
    pub filesystem_kind: String,
    /// Volume serial number; 0 when unavailable.
    pub serial_number: u32,
    /// Filesystem capability flag bitset as reported by the OS.
    pub flags: u32,
    /// Maximum path-component length supported by the filesystem.
    pub max_component_length: u32,
    /// First mount path, or empty when the volume is not mounted.
    pub mount_path: String,
    /// Controller addressing, when it could be resolved.
    pub controller_address: Option<ControllerAddress>,
}

impl VolumeRecord {
    /// Identity comparison — `identifier` only.
    #[inline]
    pub fn same_identity(&self, other: &VolumeRecord) -> bool {
        self.identifier == other.identifier
    }

    /// Deep comparison across the observable attribute fields.
    ///
    /// `controller_address` is intentionally excluded: addressing is
    /// best-effort metadata and a resolution hiccup must not look like a
    /// volume change.
    pub fn attributes_differ(&self, other: &VolumeRecord) -> bool {
        self.label != other.label
            || self.mount_path != other.mount_path
            || self.serial_number != other.serial_number
            || self.filesystem_kind != other.filesystem_kind
            || self.flags != other.flags
            || self.max_component_length != other.max_component_length
    }
}

impl std::fmt::Display for VolumeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} label={:?} fs={} serial={:#010x} path={:?}",
            self.identifier, self.label, self.filesystem_kind, self.serial_number, self.mount_path
        )?;
        if let Some(addr) = self.controller_address {
            write!(f, " scsi={}.{}.{}", addr.bus, addr.port, addr.target_id)?;
        }
        Ok(())
    }
}
