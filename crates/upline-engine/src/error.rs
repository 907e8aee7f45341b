//! Error types for the engine.

use thiserror::Error;
use upline_ledger::ParticipantId;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned to calling workflows.
///
/// Propagation itself never returns these; its failures land in a
/// [`PropagationReport`](crate::PropagationReport).
#[derive(Debug, Error)]
pub enum Error {
    /// The hierarchy store failed
    #[error(transparent)]
    Ledger(#[from] upline_ledger::Error),

    /// No participant with this id
    #[error("participant {0} not found")]
    NotFound(ParticipantId),

    /// The named recruiter is not registered
    #[error("recruiter {0} not found")]
    UnknownParent(ParticipantId),

    /// Investment posted before activation
    #[error("participant {0} is not active")]
    NotActive(ParticipantId),

    /// Amount is zero or not a whole number of minor units
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
