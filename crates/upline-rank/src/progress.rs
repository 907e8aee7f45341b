//! Progress toward the next tier.

use crate::{Money, RankTable, RankTier};

/// Where a team volume sits within the tier ladder.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RankProgress<'a> {
    pub current: &'a RankTier,
    pub next: Option<&'a RankTier>,
    /// Percentage of the way from `current` to `next`, in `[0, 100]`.
    pub percent: f64,
    pub is_max_rank: bool,
}

impl RankTable {
    /// Progress of `volume` from its current tier toward the next one.
    ///
    /// At the top tier the percentage is always 100.
    pub fn progress(&self, volume: Money) -> RankProgress<'_> {
        let index = self.position(volume);
        let current = &self.tiers()[index];
        let Some(next) = self.tiers().get(index + 1) else {
            return RankProgress {
                current,
                next: None,
                percent: 100.0,
                is_max_rank: true,
            };
        };

        let span = next.min_volume.saturating_sub(current.min_volume);
        let gained = volume.saturating_sub(current.min_volume);
        let percent = if span.is_zero() {
            100.0
        } else {
            (gained.micros() as f64 / span.micros() as f64 * 100.0).clamp(0.0, 100.0)
        };

        RankProgress {
            current,
            next: Some(next),
            percent,
            is_max_rank: false,
        }
    }
}
