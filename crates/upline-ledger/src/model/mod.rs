//! Ledger models.
//!
//! - [`Participant`] - account node with an upward recruiter pointer and
//!   rolled-up team totals
//! - [`LevelAggregate`] - counters per participant per relative level
//! - [`CommissionTransaction`] - write-once audit trail of commissions
//!
//! Deltas ([`AggregateDelta`], [`TotalsDelta`]) are what writers send; stores
//! add them under their own atomicity, so no writer computes an absolute
//! value from a stale read.

mod aggregate;
mod commission;
mod participant;

pub use aggregate::{AggregateDelta, Level, LevelAggregate, MAX_LEVEL};
pub use commission::{CommissionTransaction, NewCommission};
pub use participant::{
    Participant, ParticipantId, ParticipantStatus, ParticipantSummary, RankUpdate, TotalsDelta,
    MAX_ID_LEN,
};

use std::time::{SystemTime, UNIX_EPOCH};

use upline_rank::Money;

use crate::error::{Error, Result};

/// Current Unix time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub(crate) fn checked_add(a: Money, b: Money, what: impl FnOnce() -> String) -> Result<Money> {
    a.checked_add(b).ok_or_else(|| Error::Overflow(what()))
}
