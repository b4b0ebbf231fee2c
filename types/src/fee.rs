//! Commitment fee schedule.
//!
//! Fees rise linearly from the day-1 minimum to the day-12 maximum and are
//! rounded to four decimal places of SOL. All arithmetic is integer lamports,
//! so the same day always yields the same fee.

use std::fmt;
use std::iter::Sum;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DayNumber, TOTAL_DAYS};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Four decimal places of SOL.
pub const FEE_ROUNDING_UNIT: u64 = 100_000;

/// Headroom a payer needs on top of the commitment fee for signature fees and
/// rent of the new mint, metadata and edition accounts.
pub const ESTIMATED_NETWORK_COST: Lamports = Lamports(20_000_000);

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Lamports(u64);

impl Lamports {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Sum for Lamports {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

/// Renders as SOL with four decimals, e.g. `0.0164 SOL`. Digits past the
/// fourth decimal are truncated.
impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / LAMPORTS_PER_SOL;
        let frac = (self.0 % LAMPORTS_PER_SOL) / FEE_ROUNDING_UNIT;
        write!(f, "{whole}.{frac:04} SOL")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeeScheduleError {
    #[error("minimum fee {min} exceeds maximum fee {max}")]
    Inverted { min: Lamports, max: Lamports },
    #[error("fee bound {0:?} is not a multiple of 100000 lamports")]
    Unaligned(Lamports),
}

/// Linear fee schedule between a day-1 minimum and a day-12 maximum.
///
/// # Invariants
///
/// - `min <= max`
/// - both bounds are multiples of [`FEE_ROUNDING_UNIT`], so `fee(1) == min`
///   and `fee(12) == max` exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    min: Lamports,
    max: Lamports,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

impl FeeSchedule {
    /// 0.01 SOL.
    pub const DEFAULT_MIN: Lamports = Lamports(10_000_000);
    /// 0.08 SOL.
    pub const DEFAULT_MAX: Lamports = Lamports(80_000_000);

    pub fn new(min: Lamports, max: Lamports) -> Result<Self, FeeScheduleError> {
        for bound in [min, max] {
            if bound.0 % FEE_ROUNDING_UNIT != 0 {
                return Err(FeeScheduleError::Unaligned(bound));
            }
        }
        if min > max {
            return Err(FeeScheduleError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> Lamports {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Lamports {
        self.max
    }

    #[must_use]
    pub fn fee(&self, day: DayNumber) -> Lamports {
        // Work in units of `value * steps` so the interpolation stays exact
        // until the single rounding step.
        let steps = (TOTAL_DAYS - 1) as u128;
        let span = u128::from(self.max.0 - self.min.0);
        let scaled = u128::from(self.min.0) * steps + day.index() as u128 * span;
        let unit = u128::from(FEE_ROUNDING_UNIT) * steps;
        let rounded = (scaled + unit / 2) / unit * u128::from(FEE_ROUNDING_UNIT);
        Lamports(rounded as u64)
    }

    /// Fee for a raw day number.
    ///
    /// Panics when `day` is outside `1..=12`; an out-of-range day here is a
    /// caller bug, not a recoverable condition.
    #[must_use]
    pub fn fee_for_day(&self, day: u8) -> Lamports {
        match DayNumber::new(day) {
            Ok(day) => self.fee(day),
            Err(err) => panic!("fee requested for invalid day: {err}"),
        }
    }

    /// Total paid by a user who checks in on every day.
    #[must_use]
    pub fn total(&self) -> Lamports {
        DayNumber::all().map(|day| self.fee(day)).sum()
    }
}

/// Whether `balance` covers `fee` plus [`ESTIMATED_NETWORK_COST`].
#[must_use]
pub fn can_afford(balance: Lamports, fee: Lamports) -> bool {
    balance >= fee.saturating_add(ESTIMATED_NETWORK_COST)
}
