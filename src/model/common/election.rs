use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an election is relative to its voting window `[start, end]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    /// Voting has not opened yet.
    Upcoming,
    /// Voting is open.
    Active,
    /// Voting has closed but an admin has not declared the results.
    EndedPendingDeclaration,
    /// Voting has closed and the results are public.
    EndedDeclared,
}

impl WindowState {
    /// Classify `now` against the window. Both ends of the window are inclusive.
    pub fn at(
        now: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        results_declared: bool,
    ) -> Self {
        if now < start {
            Self::Upcoming
        } else if now <= end {
            Self::Active
        } else if results_declared {
            Self::EndedDeclared
        } else {
            Self::EndedPendingDeclaration
        }
    }

    /// Votes can only be cast while the election is active.
    pub fn accepts_votes(self) -> bool {
        self == Self::Active
    }

    pub fn has_ended(self) -> bool {
        matches!(self, Self::EndedPendingDeclaration | Self::EndedDeclared)
    }
}

/// Tallies are always visible to admins; everyone else must wait for the declaration.
pub fn results_visible(results_declared: bool, caller_is_admin: bool) -> bool {
    caller_is_admin || results_declared
}
