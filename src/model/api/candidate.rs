use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{id::ApiId, party::PartyDescription},
    db::{
        candidate::{Candidate, NewCandidate},
        party::Party,
    },
};

fn check_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Missing candidate name".to_string()));
    }
    Ok(name.to_string())
}

/// A new candidate, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: ApiId,
    pub election: ApiId,
}

impl TryFrom<CandidateSpec> for NewCandidate {
    type Error = Error;

    fn try_from(spec: CandidateSpec) -> Result<Self> {
        Ok(Self {
            name: check_name(&spec.name)?,
            party: spec.party.into(),
            election: spec.election.into(),
        })
    }
}

/// Changes to an existing candidate. Candidates cannot move between elections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateUpdate {
    pub name: String,
    pub party: ApiId,
}

impl CandidateUpdate {
    pub fn validate(self) -> Result<(String, ApiId)> {
        Ok((check_name(&self.name)?, self.party))
    }
}

/// A candidate, with their party's details when the party still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub election: ApiId,
    pub party: Option<PartyDescription>,
}

impl CandidateDescription {
    pub fn new(candidate: Candidate, party: Option<Party>) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.candidate.name,
            election: candidate.candidate.election.into(),
            party: party.map(PartyDescription::from),
        }
    }
}
