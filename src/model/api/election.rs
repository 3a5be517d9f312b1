use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId},
    common::election::WindowState,
    db::election::{Election, ElectionDetails},
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: String,
    pub election_type: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TryFrom<ElectionSpec> for ElectionDetails {
    type Error = Error;

    fn try_from(spec: ElectionSpec) -> Result<Self> {
        if spec.title.trim().is_empty() {
            return Err(Error::Validation("Missing title".to_string()));
        }
        let blank_to_none = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Ok(Self {
            title: spec.title.trim().to_string(),
            description: spec.description,
            level: spec.level,
            election_type: spec.election_type,
            state: blank_to_none(spec.state),
            city: blank_to_none(spec.city),
            start_time: spec.start_time,
            end_time: spec.end_time,
        })
    }
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    /// Election unique ID.
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub level: String,
    pub election_type: String,
    pub state: Option<String>,
    pub city: Option<String>,
    /// Voting opens.
    pub start_time: DateTime<Utc>,
    /// Voting closes.
    pub end_time: DateTime<Utc>,
    /// Where the voting window stands at the time of the request.
    pub window: WindowState,
    pub results_declared: bool,
    /// Candidates, in ballot order.
    pub candidates: Vec<CandidateDescription>,
}

impl ElectionDescription {
    pub fn new(
        election: Election,
        candidates: Vec<CandidateDescription>,
        now: DateTime<Utc>,
    ) -> Self {
        let window = election.window(now);
        let details = election.election.details;
        Self {
            id: election.id.into(),
            title: details.title,
            description: details.description,
            level: details.level,
            election_type: details.election_type,
            state: details.state,
            city: details.city,
            start_time: details.start_time,
            end_time: details.end_time,
            window,
            results_declared: election.election.results_declared,
            candidates,
        }
    }
}
