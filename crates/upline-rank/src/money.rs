//! Fixed-point money.
//!
//! One major currency unit is 1,000,000 micro-units. Amounts coming from
//! workflows are whole minor units (10,000 micros each), which keeps every
//! basis-point commission in the rate schedule exact: a 50 bps share of one
//! minor unit is 50 micros, never a fraction.

use std::fmt;

/// Micro-units per major currency unit.
pub const MICROS_PER_UNIT: u64 = 1_000_000;

/// Micro-units per minor currency unit (paise, cents).
pub const MICROS_PER_MINOR: u64 = 10_000;

/// Basis points in one whole.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// An exact, non-negative amount of money in micro-units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from raw micro-units.
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Create from minor units. `None` on overflow.
    pub const fn from_minor(minor: u64) -> Option<Self> {
        match minor.checked_mul(MICROS_PER_MINOR) {
            Some(micros) => Some(Self(micros)),
            None => None,
        }
    }

    /// Create from whole major units. `None` on overflow.
    pub const fn from_units(units: u64) -> Option<Self> {
        match units.checked_mul(MICROS_PER_UNIT) {
            Some(micros) => Some(Self(micros)),
            None => None,
        }
    }

    /// Create from whole major units at compile time.
    ///
    /// Panics during const evaluation on overflow, so only use it for
    /// constant tables.
    pub const fn units(units: u64) -> Self {
        Self(units * MICROS_PER_UNIT)
    }

    /// Raw micro-units.
    pub const fn micros(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(micros) => Some(Self(micros)),
            None => None,
        }
    }

    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Share of this amount at `bps` basis points, rounded down.
    ///
    /// Exact whenever the amount is a whole number of minor units and
    /// `bps` divides into micros evenly, which holds for every rate in the
    /// commission schedule.
    pub const fn share_bps(self, bps: u32) -> Self {
        let share = (self.0 as u128 * bps as u128) / BPS_DENOMINATOR as u128;
        // bps <= 10_000 keeps the share at or below self
        Self(share as u64)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0 / MICROS_PER_UNIT;
        let frac = self.0 % MICROS_PER_UNIT;
        let digits = format!("{:06}", frac);
        let trimmed = digits.trim_end_matches('0');
        if trimmed.len() <= 2 {
            write!(f, "{}.{:0<2}", units, trimmed)
        } else {
            write!(f, "{}.{}", units, trimmed)
        }
    }
}
