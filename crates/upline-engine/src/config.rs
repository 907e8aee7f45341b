//! Engine configuration.

use upline_rank::RankTable;

use crate::schedule::CommissionSchedule;

/// Parameters shared by live propagation and reconciliation.
///
/// Both paths read the same schedule and rank table, so they cannot
/// disagree on a rate or a threshold.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub schedule: CommissionSchedule,
    pub ranks: RankTable,
}

impl EngineConfig {
    #[must_use]
    pub fn with_schedule(mut self, schedule: CommissionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    #[must_use]
    pub fn with_ranks(mut self, ranks: RankTable) -> Self {
        self.ranks = ranks;
        self
    }
}
