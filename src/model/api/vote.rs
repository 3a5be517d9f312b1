use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId, party::PartyDescription},
    db::vote::Vote,
    mongodb::Id,
};
use crate::service::voting::Tally;

/// A voter's choice in one election.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidate: ApiId,
}

/// Confirmation of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub id: ApiId,
    pub election: ApiId,
    pub candidate: ApiId,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            election: vote.election.into(),
            candidate: vote.candidate.into(),
            cast_at: vote.cast_at,
        }
    }
}

/// A voter's own vote, with who it was for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteDetails {
    pub election: ApiId,
    pub election_title: String,
    pub candidate: CandidateDescription,
    pub cast_at: DateTime<Utc>,
}

/// One candidate's line in the published results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub candidate: ApiId,
    pub name: String,
    pub party: Option<PartyDescription>,
    pub votes: u64,
}

/// The tally for an election, most votes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election: ApiId,
    pub title: String,
    pub results_declared: bool,
    pub total_votes: u64,
    pub tallies: Vec<CandidateTally>,
}

impl ElectionResults {
    /// Build the results, looking up each candidate's party with `party_of`.
    pub fn new(tally: Tally, party_of: impl Fn(Id) -> Option<PartyDescription>) -> Self {
        let total_votes = tally.total();
        let tallies = tally
            .rows
            .into_iter()
            .map(|row| CandidateTally {
                candidate: row.candidate.id.into(),
                party: party_of(row.candidate.party),
                name: row.candidate.candidate.name,
                votes: row.votes,
            })
            .collect();
        let election = tally.election;
        Self {
            election: election.id.into(),
            title: election.election.details.title,
            results_declared: election.election.results_declared,
            total_votes,
            tallies,
        }
    }
}

/// Who voted for whom. Admin eyes only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub voter: ApiId,
    /// Absent if the account has been deleted.
    pub name: Option<String>,
    pub email: Option<String>,
    pub candidate: ApiId,
    pub cast_at: DateTime<Utc>,
}

/// Results plus the full voter list, for admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminElectionResults {
    #[serde(flatten)]
    pub results: ElectionResults,
    pub voters: Vec<VoterRecord>,
}
