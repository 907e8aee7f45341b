//! Per-level aggregate rows.

use std::fmt;

use serde::{Deserialize, Serialize};
use upline_rank::Money;

use crate::error::{Error, Result};
use crate::model::{checked_add, ParticipantId};

/// Deepest ancestor level that receives credit.
pub const MAX_LEVEL: u8 = 5;

/// Distance between a descendant and an ancestor, in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Every level, nearest first.
    pub const ALL: [Level; MAX_LEVEL as usize] = [Level(1), Level(2), Level(3), Level(4), Level(5)];

    pub const FIRST: Level = Level(1);

    pub const fn new(level: u8) -> Option<Self> {
        if level >= 1 && level <= MAX_LEVEL {
            Some(Self(level))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Level {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value).ok_or_else(|| {
            Error::InvalidInput(format!("level {} outside 1..={}", value, MAX_LEVEL))
        })
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Counters for one participant at one relative level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelAggregate {
    pub participant_id: ParticipantId,
    pub level: Level,
    /// Descendants registered at this level
    pub count: u64,
    /// Descendants at this level that crossed the activation threshold
    pub active: u64,
    /// Invested amounts attributed at this level
    pub volume: Money,
    /// Commission earned at this level
    pub commission: Money,
}

impl LevelAggregate {
    pub fn zeroed(participant_id: ParticipantId, level: Level) -> Self {
        Self {
            participant_id,
            level,
            count: 0,
            active: 0,
            volume: Money::ZERO,
            commission: Money::ZERO,
        }
    }

    /// Add a delta, failing without mutation on overflow.
    pub fn apply(&mut self, delta: &AggregateDelta) -> Result<()> {
        let what = |field: &str| format!("{} of {} at {}", field, self.participant_id, self.level);
        let count = self
            .count
            .checked_add(delta.count)
            .ok_or_else(|| Error::Overflow(what("count")))?;
        let active = self
            .active
            .checked_add(delta.active)
            .ok_or_else(|| Error::Overflow(what("active")))?;
        let volume = checked_add(self.volume, delta.volume, || what("volume"))?;
        let commission = checked_add(self.commission, delta.commission, || what("commission"))?;

        self.count = count;
        self.active = active;
        self.volume = volume;
        self.commission = commission;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.active = 0;
        self.volume = Money::ZERO;
        self.commission = Money::ZERO;
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0 && self.active == 0 && self.volume.is_zero() && self.commission.is_zero()
    }
}

/// Additive change to one aggregate row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDelta {
    pub count: u64,
    pub active: u64,
    pub volume: Money,
    pub commission: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bounds() {
        assert!(Level::new(0).is_none());
        assert_eq!(Level::new(1), Some(Level::FIRST));
        assert!(Level::new(5).is_some());
        assert!(Level::new(6).is_none());
        assert_eq!(Level::new(2).map(Level::get), Some(2));
        assert_eq!(Level::ALL.len(), MAX_LEVEL as usize);
    }

    #[test]
    fn level_serde_rejects_out_of_range() {
        assert_eq!(serde_json::to_string(&Level::FIRST).unwrap(), "1");
        assert!(serde_json::from_str::<Level>("3").is_ok());
        assert!(serde_json::from_str::<Level>("9").is_err());
    }

    #[test]
    fn apply_delta() {
        let id = ParticipantId::parse("root").unwrap();
        let mut row = LevelAggregate::zeroed(id, Level::FIRST);
        assert!(row.is_zero());
        row.apply(&AggregateDelta {
            count: 1,
            active: 1,
            volume: Money::units(1_000),
            commission: Money::units(50),
        })
        .unwrap();
        assert_eq!(row.count, 1);
        assert_eq!(row.commission, Money::units(50));

        row.reset();
        assert!(row.is_zero());
    }
}
