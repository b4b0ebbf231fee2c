//! Core proof types for validated journey input.
//!
//! These types enforce invariants at construction time. Once you hold a value,
//! you know it satisfies all required constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Number of days in every journey.
pub const TOTAL_DAYS: usize = 12;

/// Maximum habit name length, in characters, after trimming.
pub const MAX_HABIT_NAME_CHARS: usize = 50;

/// A user-supplied habit label.
///
/// # Invariants
///
/// - Content is trimmed
/// - Content is never empty
/// - Content is at most [`MAX_HABIT_NAME_CHARS`] characters
///
/// # Serde
///
/// Serializes as a plain JSON string. Deserialization re-validates, so a
/// hand-edited record with an empty name fails to load instead of producing
/// an unnamed habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HabitName(String);

impl HabitName {
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let chars = trimmed.chars().count();
        if chars > MAX_HABIT_NAME_CHARS {
            return Err(ValidationError::NameTooLong {
                max: MAX_HABIT_NAME_CHARS,
                actual: chars,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HabitName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HabitName> for String {
    fn from(value: HabitName) -> Self {
        value.0
    }
}

impl AsRef<str> for HabitName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for HabitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A 1-based journey day, guaranteed to lie in `1..=TOTAL_DAYS`.
///
/// Out-of-range day numbers are unrepresentable, so the fee schedule and the
/// slot lookups index without bounds checks of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DayNumber(u8);

impl DayNumber {
    pub const FIRST: Self = Self(1);
    pub const LAST: Self = Self(TOTAL_DAYS as u8);

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value == 0 || usize::from(value) > TOTAL_DAYS {
            return Err(ValidationError::DayOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Day for a zero-based slot index.
    ///
    /// Panics on an index past the last slot: callers iterate a fixed-length
    /// slot array, so a miss is a programming error.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        assert!(index < TOTAL_DAYS, "slot index {index} out of range");
        Self(index as u8 + 1)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// Iterate every day of a journey, first to last.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=TOTAL_DAYS as u8).map(Self)
    }
}

impl TryFrom<u8> for DayNumber {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayNumber> for u8 {
    fn from(value: DayNumber) -> Self {
        value.0
    }
}

impl fmt::Display for DayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn habit_name_is_trimmed() {
        let name = HabitName::new("  Read 30 min  ").unwrap();
        assert_eq!(name.as_str(), "Read 30 min");
    }

    #[test]
    fn habit_name_rejects_blank() {
        assert!(matches!(
            HabitName::new("   "),
            Err(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn habit_name_counts_chars_not_bytes() {
        let fifty = "é".repeat(50);
        assert!(HabitName::new(&fifty).is_ok());

        let fifty_one = "é".repeat(51);
        assert!(matches!(
            HabitName::new(&fifty_one),
            Err(ValidationError::NameTooLong { max: 50, actual: 51 })
        ));
    }

    #[test]
    fn habit_name_deserialize_validates() {
        let err = serde_json::from_str::<HabitName>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn day_number_bounds() {
        assert!(DayNumber::new(0).is_err());
        assert!(DayNumber::new(13).is_err());
        assert_eq!(DayNumber::new(12).unwrap(), DayNumber::LAST);
        assert_eq!(DayNumber::from_index(0), DayNumber::FIRST);
        assert_eq!(DayNumber::all().count(), TOTAL_DAYS);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn day_number_from_index_fails_fast() {
        let _ = DayNumber::from_index(TOTAL_DAYS);
    }
}
