//! Upline Rank Tiers
//!
//! A participant's rank is a pure function of the team volume rolled up
//! from its descendants. Tiers are a static ladder of volume thresholds;
//! the rank is the tier with the greatest threshold not above the volume.
//!
//! # Standard Ladder
//!
//! | Tier | Minimum team volume |
//! |---|---|
//! | Starter | 0 |
//! | Manager | 1,500,000 |
//! | Senior Manager | 5,000,000 |
//! | Director | 10,000,000 |
//!
//! # Example
//!
//! ```
//! use upline_rank::{progress, rank_for, Money};
//!
//! assert_eq!(rank_for(Money::ZERO).name, "Starter");
//!
//! let p = progress(Money::units(3_250_000));
//! assert_eq!(p.current.name, "Manager");
//! assert_eq!(p.percent, 50.0);
//! ```

mod money;
mod progress;
mod table;

pub use money::{Money, BPS_DENOMINATOR, MICROS_PER_MINOR, MICROS_PER_UNIT};
pub use progress::RankProgress;
pub use table::{RankTable, RankTableError, RankTier, STANDARD_TIERS};

static STANDARD: RankTable = RankTable::standard();

/// Tier for `volume` on the standard ladder.
pub fn rank_for(volume: Money) -> &'static RankTier {
    STANDARD.rank_for(volume)
}

/// Progress of `volume` on the standard ladder.
pub fn progress(volume: Money) -> RankProgress<'static> {
    STANDARD.progress(volume)
}
