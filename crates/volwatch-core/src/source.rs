/// Snapshot source seam — the tracker's only window onto the host.
///
/// The engine never enumerates hardware itself; it asks a
/// [`SnapshotSource`] for the complete current volume set and diffs the
/// answer against what it saw last time. The Windows implementation lives
/// in [`crate::platform`]; tests supply scripted in-memory sources.
use crate::model::Snapshot;

/// Produces, on demand, the complete set of currently visible volumes.
///
/// Implementations are pure functions of OS state: no history, safe to
/// call repeatedly and concurrently. Attribute resolution is best-effort —
/// a record whose controller address cannot be resolved carries `None`
/// rather than failing the query. A whole-query `Err` is legitimate
/// (the tracker degrades it to "no volumes visible").
pub trait SnapshotSource: Send + Sync {
    fn query(&self) -> anyhow::Result<Snapshot>;
}

impl<F> SnapshotSource for F
where
    F: Fn() -> anyhow::Result<Snapshot> + Send + Sync,
{
    fn query(&self) -> anyhow::Result<Snapshot> {
        self()
    }
}
