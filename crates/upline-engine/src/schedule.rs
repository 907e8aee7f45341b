//! Level commission schedule.

use upline_ledger::{Level, Money, MAX_LEVEL};

/// Basis points paid to each ancestor level, nearest first.
///
/// The advertised plan: 5% + 2% + 0.5% + 0.5% + 0.5% = 8.5%.
pub const STANDARD_RATES_BPS: [u32; MAX_LEVEL as usize] = [500, 200, 50, 50, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSchedule {
    rates_bps: [u32; MAX_LEVEL as usize],
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommissionSchedule {
    pub const fn standard() -> Self {
        Self {
            rates_bps: STANDARD_RATES_BPS,
        }
    }

    /// Custom schedule. `None` if any rate exceeds 100%.
    pub fn new(rates_bps: [u32; MAX_LEVEL as usize]) -> Option<Self> {
        rates_bps
            .iter()
            .all(|&bps| bps <= 10_000)
            .then_some(Self { rates_bps })
    }

    pub fn rate_bps(&self, level: Level) -> u32 {
        self.rates_bps[usize::from(level.get() - 1)]
    }

    /// Commission owed at `level` on `amount`.
    pub fn commission(&self, level: Level, amount: Money) -> Money {
        amount.share_bps(self.rate_bps(level))
    }

    pub fn total_bps(&self) -> u32 {
        self.rates_bps.iter().sum()
    }
}
