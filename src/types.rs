//! Shared error and result types

use thiserror::Error;

/// Error taxonomy for guarantee mutations and fetches
#[derive(Debug, Error)]
pub enum EngineError {
    /// A mutation for this elector is already in flight. Rejected locally,
    /// before any network call; the caller is expected to disable the
    /// triggering control while the elector is locked.
    #[error("a mutation for elector {0} is already in flight")]
    Busy(String),

    /// The guarantee service returned a non-success response
    #[error("guarantee service rejected the request: {0}")]
    RemoteRejected(String),

    /// Network or timeout failure before any response was received
    #[error("guarantee service unreachable: {0}")]
    RemoteUnreachable(String),

    /// A precondition on the elector's local guarantee state does not hold
    #[error("invalid guarantee state for elector {koc_id}: {reason}")]
    InvalidState { koc_id: String, reason: String },

    /// The elector is not present in the entity store
    #[error("unknown elector: {0}")]
    UnknownElector(String),
}

impl EngineError {
    pub(crate) fn invalid_state(koc_id: &str, reason: &str) -> Self {
        Self::InvalidState {
            koc_id: koc_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
