//! Casting votes and counting them.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    common::election::results_visible,
    db::{
        candidate::Candidate,
        election::Election,
        vote::{NewVote, Vote},
    },
    mongodb::Id,
};
use crate::store::{CandidateRepo, ElectionRepo, VoteRepo};

/// Record `voter`'s vote for `candidate` in `election` at time `now`.
///
/// The checks run in a fixed order, so a caller always learns about the most
/// fundamental problem first. The final insert is guarded by the store's
/// (voter, election) uniqueness, so concurrent attempts for the same pair
/// produce exactly one vote and [`Error::DuplicateVote`] for every other one.
pub async fn cast_vote<R>(
    repo: &R,
    voter: Id,
    election_id: Id,
    candidate_id: Id,
    now: DateTime<Utc>,
) -> Result<Vote>
where
    R: ElectionRepo + CandidateRepo + VoteRepo + ?Sized,
{
    let election = repo
        .election_by_id(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;

    let window = election.window(now);
    if !window.accepts_votes() {
        return Err(Error::OutsideVotingWindow(window));
    }

    let stands_here = repo
        .candidate_by_id(candidate_id)
        .await?
        .map_or(false, |c| c.election == election_id)
        && election.candidates.contains(&candidate_id);
    if !stands_here {
        return Err(Error::CandidateNotInElection);
    }

    if repo.vote_by_voter(voter, election_id).await?.is_some() {
        return Err(Error::DuplicateVote);
    }

    let vote = repo
        .insert_vote(NewVote {
            voter,
            candidate: candidate_id,
            election: election_id,
            cast_at: now,
        })
        .await?;
    info!("Vote {} cast in election {election_id}", vote.id);
    Ok(vote)
}

/// One candidate's line in a tally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRow {
    pub candidate: Candidate,
    pub votes: u64,
}

/// The vote counts for an election.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub election: Election,
    /// Every candidate, including those with no votes, most votes first.
    pub rows: Vec<TallyRow>,
}

impl Tally {
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|row| row.votes).sum()
    }
}

/// Count the votes in an election.
///
/// Non-admin callers only see the tally once the results have been declared.
pub async fn results<R>(repo: &R, election_id: Id, caller_is_admin: bool) -> Result<Tally>
where
    R: ElectionRepo + CandidateRepo + VoteRepo + ?Sized,
{
    let election = repo
        .election_by_id(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {election_id}")))?;
    if !results_visible(election.results_declared, caller_is_admin) {
        return Err(Error::ResultsNotDeclared);
    }

    let counts = repo.tally(election_id).await?;
    let mut rows: Vec<TallyRow> = repo
        .candidates_in_election(election_id)
        .await?
        .into_iter()
        .map(|candidate| {
            let votes = counts
                .iter()
                .find(|count| count.candidate == candidate.id)
                .map_or(0, |count| count.votes);
            TallyRow { candidate, votes }
        })
        .collect();
    // Stable, so ties keep ballot order.
    rows.sort_by(|a, b| b.votes.cmp(&a.votes));

    Ok(Tally { election, rows })
}
