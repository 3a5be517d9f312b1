use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::election::WindowState, mongodb::Id};

/// The admin-editable description of an election.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionDetails {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// e.g. "National", "State", "Municipal".
    pub level: String,
    /// e.g. "General", "By-election".
    pub election_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Voting opens at this time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Voting closes at this time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
}

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    #[serde(flatten)]
    pub details: ElectionDetails,
    /// Candidates standing, in the order they were added.
    #[serde(default)]
    pub candidates: Vec<Id>,
    /// Have the results been made public?
    #[serde(default)]
    pub results_declared: bool,
}

impl ElectionCore {
    pub fn new(details: ElectionDetails) -> Self {
        Self {
            details,
            candidates: Vec::new(),
            results_declared: false,
        }
    }

    /// Where this election's voting window stands at `now`.
    pub fn window(&self, now: DateTime<Utc>) -> WindowState {
        WindowState::at(
            now,
            self.details.start_time,
            self.details.end_time,
            self.results_declared,
        )
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
pub mod examples {
    use chrono::{Duration, Timelike};

    use super::*;

    macro_rules! midnight_today {
        () => {{
            Utc::now()
                .with_hour(0)
                .and_then(|t| t.with_minute(0))
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .unwrap()
        }};
    }

    impl ElectionDetails {
        fn example(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
            Self {
                title: "General Election".to_string(),
                description: "Choose the national government".to_string(),
                level: "National".to_string(),
                election_type: "General".to_string(),
                state: None,
                city: None,
                start_time,
                end_time,
            }
        }

        /// Running from midnight today for 30 days.
        pub fn current_example() -> Self {
            let start_time = midnight_today!();
            Self::example(start_time, start_time + Duration::days(30))
        }

        /// Starting in 10 days.
        pub fn future_example() -> Self {
            let start_time = midnight_today!() + Duration::days(10);
            Self {
                title: "Municipal Election".to_string(),
                level: "Local".to_string(),
                state: Some("Maharashtra".to_string()),
                city: Some("Pune".to_string()),
                ..Self::example(start_time, start_time + Duration::days(1))
            }
        }

        /// Ended yesterday.
        pub fn past_example() -> Self {
            let end_time = midnight_today!() - Duration::days(1);
            Self {
                title: "Past By-election".to_string(),
                election_type: "By-election".to_string(),
                ..Self::example(end_time - Duration::days(7), end_time)
            }
        }
    }
}
