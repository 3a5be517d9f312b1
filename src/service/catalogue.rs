//! Admin management of elections, candidates and parties.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, ElectionDetails, NewElection},
        party::{NewParty, Party, PartyCore},
    },
    mongodb::Id,
};
use crate::store::{CandidateRepo, ElectionRepo, PartyRepo};

fn check_window(details: &ElectionDetails) -> Result<()> {
    if details.end_time <= details.start_time {
        return Err(Error::Validation(
            "Election must end after it starts".to_string(),
        ));
    }
    Ok(())
}

pub async fn create_election<R>(repo: &R, details: ElectionDetails) -> Result<Election>
where
    R: ElectionRepo + ?Sized,
{
    check_window(&details)?;
    let election = repo.insert_election(NewElection::new(details)).await?;
    info!("Created election {}", election.id);
    Ok(election)
}

pub async fn update_election<R>(repo: &R, id: Id, details: ElectionDetails) -> Result<Election>
where
    R: ElectionRepo + ?Sized,
{
    check_window(&details)?;
    repo.update_election(id, details)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))
}

/// Delete an election with all its candidates and votes.
pub async fn delete_election<R>(repo: &R, id: Id) -> Result<()>
where
    R: ElectionRepo + ?Sized,
{
    if !repo.delete_election(id).await? {
        return Err(Error::not_found(format!("Election {id}")));
    }
    info!("Deleted election {id} with its candidates and votes");
    Ok(())
}

/// Publish (or withdraw) an election's results. Results can only be published
/// once voting has closed.
pub async fn declare_results<R>(
    repo: &R,
    id: Id,
    declared: bool,
    now: DateTime<Utc>,
) -> Result<Election>
where
    R: ElectionRepo + ?Sized,
{
    let mut election = repo
        .election_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))?;
    if declared && !election.window(now).has_ended() {
        return Err(Error::ElectionNotEnded);
    }
    repo.set_results_declared(id, declared).await?;
    election.results_declared = declared;
    info!(
        "Results for election {id} {}",
        if declared { "declared" } else { "withdrawn" }
    );
    Ok(election)
}

async fn require_party<R>(repo: &R, party: Id) -> Result<()>
where
    R: PartyRepo + ?Sized,
{
    match repo.party_by_id(party).await? {
        Some(_) => Ok(()),
        None => Err(Error::not_found(format!("Party {party}"))),
    }
}

/// Add a candidate to an election.
pub async fn create_candidate<R>(repo: &R, candidate: NewCandidate) -> Result<Candidate>
where
    R: CandidateRepo + PartyRepo + ?Sized,
{
    require_party(repo, candidate.party).await?;
    let candidate = repo.insert_candidate(candidate).await?;
    debug!(
        "Added candidate {} to election {}",
        candidate.id, candidate.election
    );
    Ok(candidate)
}

pub async fn update_candidate<R>(repo: &R, id: Id, name: String, party: Id) -> Result<Candidate>
where
    R: CandidateRepo + PartyRepo + ?Sized,
{
    require_party(repo, party).await?;
    repo.update_candidate(id, name, party)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
}

/// Remove a candidate from its election. Candidates who have received votes
/// stay, so that no recorded vote points nowhere; the store refuses those
/// with [`Error::InUse`].
pub async fn delete_candidate<R>(repo: &R, id: Id) -> Result<()>
where
    R: CandidateRepo + ?Sized,
{
    if !repo.delete_candidate(id).await? {
        return Err(Error::not_found(format!("Candidate {id}")));
    }
    Ok(())
}

pub async fn create_party<R>(repo: &R, party: NewParty) -> Result<Party>
where
    R: PartyRepo + ?Sized,
{
    let party = repo.insert_party(party).await?;
    debug!("Created party {}", party.id);
    Ok(party)
}

pub async fn update_party<R>(repo: &R, id: Id, party: PartyCore) -> Result<Party>
where
    R: PartyRepo + ?Sized,
{
    repo.update_party(id, party)
        .await?
        .ok_or_else(|| Error::not_found(format!("Party {id}")))
}

/// Delete a party. Parties that candidates still stand for cannot be deleted.
pub async fn delete_party<R>(repo: &R, id: Id) -> Result<()>
where
    R: PartyRepo + CandidateRepo + ?Sized,
{
    if repo.party_in_use(id).await? {
        return Err(Error::InUse(format!("Party {id} still has candidates")));
    }
    if !repo.delete_party(id).await? {
        return Err(Error::not_found(format!("Party {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::model::db::{account::NewAccount, vote::NewVote};
    use crate::store::{AccountRepo, MemoryStore, VoteRepo};

    async fn voter(store: &MemoryStore) -> Id {
        store
            .insert_account(NewAccount::approved_example())
            .await
            .unwrap()
            .id
    }

    async fn with_candidate(store: &MemoryStore) -> (Election, Party, Candidate) {
        let election = create_election(store, ElectionDetails::current_example())
            .await
            .unwrap();
        let party = create_party(store, NewParty::example()).await.unwrap();
        let candidate = create_candidate(
            store,
            NewCandidate {
                name: "Meera Nair".to_string(),
                party: party.id,
                election: election.id,
            },
        )
        .await
        .unwrap();
        (election, party, candidate)
    }

    #[rocket::async_test]
    async fn election_must_end_after_it_starts() {
        let store = MemoryStore::default();
        let mut details = ElectionDetails::current_example();
        details.end_time = details.start_time;
        let result = create_election(&store, details.clone()).await;
        assert!(matches!(result, Err(Error::Validation(_))));

        let election = create_election(&store, ElectionDetails::current_example())
            .await
            .unwrap();
        details.end_time = details.start_time - Duration::hours(1);
        let result = update_election(&store, election.id, details).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[rocket::async_test]
    async fn update_keeps_candidates_and_declaration() {
        let store = MemoryStore::default();
        let (election, _, candidate) = with_candidate(&store).await;

        let renamed = ElectionDetails {
            title: "General Election (rescheduled)".to_string(),
            ..ElectionDetails::current_example()
        };
        let updated = update_election(&store, election.id, renamed).await.unwrap();
        assert_eq!(updated.details.title, "General Election (rescheduled)");
        assert_eq!(updated.candidates, vec![candidate.id]);

        let missing = update_election(&store, Id::new(), ElectionDetails::current_example()).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[rocket::async_test]
    async fn deleting_an_election_removes_candidates_and_votes() {
        let store = MemoryStore::default();
        let (election, _, candidate) = with_candidate(&store).await;
        store
            .insert_vote(NewVote {
                voter: voter(&store).await,
                candidate: candidate.id,
                election: election.id,
                cast_at: Utc::now(),
            })
            .await
            .unwrap();

        delete_election(&store, election.id).await.unwrap();
        assert!(store.candidate_by_id(candidate.id).await.unwrap().is_none());
        assert!(store.votes_in_election(election.id).await.unwrap().is_empty());

        let again = delete_election(&store, election.id).await;
        assert!(matches!(again, Err(Error::NotFound(_))));
    }

    #[rocket::async_test]
    async fn results_are_declared_only_after_voting_closes() {
        let store = MemoryStore::default();
        let running = create_election(&store, ElectionDetails::current_example())
            .await
            .unwrap();
        let result = declare_results(&store, running.id, true, Utc::now()).await;
        assert!(matches!(result, Err(Error::ElectionNotEnded)));

        let closed = create_election(&store, ElectionDetails::past_example())
            .await
            .unwrap();
        let declared = declare_results(&store, closed.id, true, Utc::now())
            .await
            .unwrap();
        assert!(declared.results_declared);
        let withdrawn = declare_results(&store, closed.id, false, Utc::now())
            .await
            .unwrap();
        assert!(!withdrawn.results_declared);
    }

    #[rocket::async_test]
    async fn candidates_are_attached_and_detached() {
        let store = MemoryStore::default();
        let (election, party, candidate) = with_candidate(&store).await;
        let listed = store.election_by_id(election.id).await.unwrap().unwrap();
        assert_eq!(listed.candidates, vec![candidate.id]);

        let no_party = create_candidate(
            &store,
            NewCandidate {
                name: "Independent".to_string(),
                party: Id::new(),
                election: election.id,
            },
        )
        .await;
        assert!(matches!(no_party, Err(Error::NotFound(_))));

        let renamed = update_candidate(&store, candidate.id, "Meera N.".to_string(), party.id)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Meera N.");
        assert_eq!(renamed.election, election.id);

        delete_candidate(&store, candidate.id).await.unwrap();
        let listed = store.election_by_id(election.id).await.unwrap().unwrap();
        assert!(listed.candidates.is_empty());
    }

    #[rocket::async_test]
    async fn candidates_with_votes_cannot_be_deleted() {
        let store = MemoryStore::default();
        let (election, _, candidate) = with_candidate(&store).await;
        store
            .insert_vote(NewVote {
                voter: voter(&store).await,
                candidate: candidate.id,
                election: election.id,
                cast_at: Utc::now(),
            })
            .await
            .unwrap();

        let result = delete_candidate(&store, candidate.id).await;
        assert!(matches!(result, Err(Error::InUse(_))));
    }

    #[rocket::async_test]
    async fn parties_in_use_cannot_be_deleted() {
        let store = MemoryStore::default();
        let (_, party, candidate) = with_candidate(&store).await;

        let result = delete_party(&store, party.id).await;
        assert!(matches!(result, Err(Error::InUse(_))));

        delete_candidate(&store, candidate.id).await.unwrap();
        delete_party(&store, party.id).await.unwrap();
        let again = delete_party(&store, party.id).await;
        assert!(matches!(again, Err(Error::NotFound(_))));
    }
}
