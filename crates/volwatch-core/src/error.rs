/// Error types surfaced by the tracker lifecycle API.
///
/// Snapshot-query failures are NOT represented here: the tracker swallows
/// them (degrading to an empty snapshot) so a trigger callback can never
/// crash. Only configuration problems the embedder must address are
/// surfaced.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The chosen trigger could not bind its native resource (timer thread
    /// creation failed, notification channel already disconnected).
    #[error("trigger binding failed: {0}")]
    Binding(String),

    /// The tracker has been released; no further enablement is possible.
    #[error("tracker has been released")]
    Released,
}
