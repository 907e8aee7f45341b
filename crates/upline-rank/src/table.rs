//! Ordered rank tier table.

use std::borrow::Cow;

use thiserror::Error;

use crate::Money;

/// A named tier reached once team volume meets `min_volume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RankTier {
    pub name: &'static str,
    pub min_volume: Money,
}

impl RankTier {
    pub const fn new(name: &'static str, min_volume: Money) -> Self {
        Self { name, min_volume }
    }
}

/// The advertised tier ladder.
pub const STANDARD_TIERS: [RankTier; 4] = [
    RankTier::new("Starter", Money::ZERO),
    RankTier::new("Manager", Money::units(1_500_000)),
    RankTier::new("Senior Manager", Money::units(5_000_000)),
    RankTier::new("Director", Money::units(10_000_000)),
];

/// Reasons a custom tier table is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankTableError {
    #[error("rank table has no tiers")]
    Empty,

    #[error("first tier {name:?} starts at {min_volume}, expected 0")]
    FirstTierNotZero { name: &'static str, min_volume: Money },

    #[error("tier {name:?} does not raise the threshold above the previous tier")]
    NotAscending { name: &'static str },

    #[error("duplicate tier name {0:?}")]
    DuplicateName(&'static str),
}

/// Tiers in strictly ascending `min_volume` order, the first at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTable {
    tiers: Cow<'static, [RankTier]>,
}

impl Default for RankTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RankTable {
    /// The static ladder in [`STANDARD_TIERS`].
    pub const fn standard() -> Self {
        const TIERS: &[RankTier] = &STANDARD_TIERS;
        Self {
            tiers: Cow::Borrowed(TIERS),
        }
    }

    /// Build a table from custom tiers, checking ordering rules.
    pub fn new(tiers: Vec<RankTier>) -> Result<Self, RankTableError> {
        let first = tiers.first().ok_or(RankTableError::Empty)?;
        if !first.min_volume.is_zero() {
            return Err(RankTableError::FirstTierNotZero {
                name: first.name,
                min_volume: first.min_volume,
            });
        }
        for pair in tiers.windows(2) {
            if pair[1].min_volume <= pair[0].min_volume {
                return Err(RankTableError::NotAscending { name: pair[1].name });
            }
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tiers[..i].iter().any(|t| t.name == tier.name) {
                return Err(RankTableError::DuplicateName(tier.name));
            }
        }
        Ok(Self {
            tiers: Cow::Owned(tiers),
        })
    }

    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    /// Index of the tier with the greatest `min_volume <= volume`.
    pub fn position(&self, volume: Money) -> usize {
        // Tier 0 is at zero, so at least one tier always qualifies.
        self.tiers
            .iter()
            .rposition(|tier| tier.min_volume <= volume)
            .unwrap_or(0)
    }

    /// The tier a participant with `volume` team volume holds.
    pub fn rank_for(&self, volume: Money) -> &RankTier {
        &self.tiers[self.position(volume)]
    }
}
