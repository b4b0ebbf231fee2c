use std::fmt;

/// Where the current check-in attempt is.
///
/// `Idle -> Building -> Submitted -> Confirmed -> Committed`. Any failure
/// returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckInPhase {
    #[default]
    Idle,
    /// Fetching a blockhash and assembling the transaction.
    Building,
    /// Handed to the signer; waiting for confirmation.
    Submitted,
    /// Confirmed on the ledger, not yet recorded in the journey.
    Confirmed,
    /// Recorded in the journey.
    Committed,
}

impl CheckInPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Committed => "committed",
        }
    }

    /// An attempt is underway.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Building | Self::Submitted | Self::Confirmed)
    }
}

impl fmt::Display for CheckInPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
