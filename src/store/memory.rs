use std::collections::{hash_map::Entry, HashMap};

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    common::account::{Role, StatusKind, ValidationStatus},
    db::{
        account::{Account, NewAccount, Profile},
        candidate::{Candidate, NewCandidate},
        election::{Election, ElectionDetails, NewElection},
        party::{NewParty, Party, PartyCore},
        vote::{CandidateCount, NewVote, Vote},
    },
    mongodb::Id,
};

use super::{AccountRepo, CandidateRepo, ElectionRepo, PartyRepo, VoteRepo};

/// A store that keeps everything in process memory.
///
/// Every operation takes the single lock for its whole duration, so each one is
/// atomic, and uniqueness checks cannot race with the inserts they guard.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<Id, Account>,
    elections: HashMap<Id, Election>,
    candidates: HashMap<Id, Candidate>,
    parties: HashMap<Id, Party>,
    votes: HashMap<Id, Vote>,
    /// Unique index over (voter, election).
    ballots: HashMap<(Id, Id), Id>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Id>) -> bool {
        self.accounts
            .values()
            .any(|a| a.profile.email == email && Some(a.id) != except)
    }

    fn party_name_taken(&self, name: &str, except: Option<Id>) -> bool {
        self.parties
            .values()
            .any(|p| p.name == name && Some(p.id) != except)
    }

    /// Everything a new vote refers to must still exist, and the candidate
    /// must stand in the vote's election.
    fn check_ballot(&self, vote: &NewVote) -> Result<()> {
        let election = self
            .elections
            .get(&vote.election)
            .ok_or_else(|| Error::not_found(format!("Election {}", vote.election)))?;
        let stands_here = election.candidates.contains(&vote.candidate)
            && self
                .candidates
                .get(&vote.candidate)
                .map_or(false, |c| c.election == vote.election);
        if !stands_here {
            return Err(Error::CandidateNotInElection);
        }
        if !self.accounts.contains_key(&vote.voter) {
            return Err(Error::not_found(format!("Account {}", vote.voter)));
        }
        Ok(())
    }

    fn remove_votes_where(&mut self, mut pred: impl FnMut(&Vote) -> bool) {
        let doomed: Vec<Vote> = self.votes.values().filter(|v| pred(v)).cloned().collect();
        for vote in doomed {
            self.votes.remove(&vote.id);
            self.ballots.remove(&(vote.voter, vote.election));
        }
    }
}

#[rocket::async_trait]
impl AccountRepo for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&account.profile.email, None) {
            return Err(Error::DuplicateIdentity(account.profile.email));
        }
        let account = Account {
            id: Id::new(),
            account,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: Id) -> Result<Option<Account>> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.profile.email == email)
            .cloned())
    }

    async fn accounts(&self, status: Option<StatusKind>) -> Result<Vec<Account>> {
        let tables = self.tables.lock().await;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| status.map_or(true, |s| a.validation.kind() == s))
            .cloned()
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn transition(
        &self,
        id: Id,
        from: &[StatusKind],
        to: ValidationStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.accounts.get_mut(&id) {
            Some(account) if from.contains(&account.validation.kind()) => {
                account.validation = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resubmit_account(
        &self,
        id: Id,
        profile: Profile,
        password_hash: Option<String>,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&profile.email, Some(id)) {
            return Err(Error::DuplicateIdentity(profile.email));
        }
        match tables.accounts.get_mut(&id) {
            Some(account) if account.validation.kind() == StatusKind::Rejected => {
                account.profile = profile;
                if let Some(hash) = password_hash {
                    account.password_hash = hash;
                }
                account.validation = ValidationStatus::Resubmitted;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(&self, id: Id, profile: Profile) -> Result<Option<Account>> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&profile.email, Some(id)) {
            return Err(Error::DuplicateIdentity(profile.email));
        }
        Ok(tables.accounts.get_mut(&id).map(|account| {
            account.profile = profile;
            account.clone()
        }))
    }

    async fn delete_account(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.accounts.remove(&id).is_none() {
            return Ok(false);
        }
        tables.remove_votes_where(|v| v.voter == id);
        Ok(true)
    }

    async fn admin_exists(&self) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.values().any(|a| a.role == Role::Admin))
    }
}

#[rocket::async_trait]
impl ElectionRepo for MemoryStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let election = Election {
            id: Id::new(),
            election,
        };
        let mut tables = self.tables.lock().await;
        tables.elections.insert(election.id, election.clone());
        Ok(election)
    }

    async fn election_by_id(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.tables.lock().await.elections.get(&id).cloned())
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        let tables = self.tables.lock().await;
        let mut elections: Vec<Election> = tables.elections.values().cloned().collect();
        elections.sort_by(|a, b| b.details.start_time.cmp(&a.details.start_time));
        Ok(elections)
    }

    async fn update_election(
        &self,
        id: Id,
        details: ElectionDetails,
    ) -> Result<Option<Election>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.elections.get_mut(&id).map(|election| {
            election.details = details;
            election.clone()
        }))
    }

    async fn set_results_declared(&self, id: Id, declared: bool) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.elections.get_mut(&id) {
            Some(election) => {
                election.results_declared = declared;
                true
            }
            None => false,
        })
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.elections.remove(&id).is_none() {
            return Ok(false);
        }
        tables.candidates.retain(|_, c| c.election != id);
        tables.remove_votes_where(|v| v.election == id);
        Ok(true)
    }
}

#[rocket::async_trait]
impl CandidateRepo for MemoryStore {
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let mut tables = self.tables.lock().await;
        let election = tables
            .elections
            .get_mut(&candidate.election)
            .ok_or_else(|| Error::not_found(format!("Election {}", candidate.election)))?;
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        election.candidates.push(candidate.id);
        tables.candidates.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.tables.lock().await.candidates.get(&id).cloned())
    }

    async fn candidates_in_election(&self, election: Id) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        // Keep the election's own ordering.
        Ok(tables
            .elections
            .get(&election)
            .map(|e| {
                e.candidates
                    .iter()
                    .filter_map(|id| tables.candidates.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_candidate(
        &self,
        id: Id,
        name: String,
        party: Id,
    ) -> Result<Option<Candidate>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.candidates.get_mut(&id).map(|candidate| {
            candidate.name = name;
            candidate.party = party;
            candidate.clone()
        }))
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.votes.values().any(|v| v.candidate == id) {
            return Err(Error::InUse(format!("Candidate {id} has received votes")));
        }
        let candidate = match tables.candidates.remove(&id) {
            Some(candidate) => candidate,
            None => return Ok(false),
        };
        if let Some(election) = tables.elections.get_mut(&candidate.election) {
            election.candidates.retain(|c| *c != id);
        }
        Ok(true)
    }

    async fn party_in_use(&self, party: Id) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.candidates.values().any(|c| c.party == party))
    }
}

#[rocket::async_trait]
impl PartyRepo for MemoryStore {
    async fn insert_party(&self, party: NewParty) -> Result<Party> {
        let mut tables = self.tables.lock().await;
        if tables.party_name_taken(&party.name, None) {
            return Err(Error::DuplicateParty(party.name));
        }
        let party = Party {
            id: Id::new(),
            party,
        };
        tables.parties.insert(party.id, party.clone());
        Ok(party)
    }

    async fn party_by_id(&self, id: Id) -> Result<Option<Party>> {
        Ok(self.tables.lock().await.parties.get(&id).cloned())
    }

    async fn parties(&self) -> Result<Vec<Party>> {
        let tables = self.tables.lock().await;
        let mut parties: Vec<Party> = tables.parties.values().cloned().collect();
        parties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parties)
    }

    async fn update_party(&self, id: Id, party: PartyCore) -> Result<Option<Party>> {
        let mut tables = self.tables.lock().await;
        if tables.party_name_taken(&party.name, Some(id)) {
            return Err(Error::DuplicateParty(party.name));
        }
        Ok(tables.parties.get_mut(&id).map(|existing| {
            existing.party = party;
            existing.clone()
        }))
    }

    async fn delete_party(&self, id: Id) -> Result<bool> {
        Ok(self.tables.lock().await.parties.remove(&id).is_some())
    }
}

#[rocket::async_trait]
impl VoteRepo for MemoryStore {
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        tables.check_ballot(&vote)?;
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        match tables.ballots.entry((vote.voter, vote.election)) {
            Entry::Occupied(_) => return Err(Error::DuplicateVote),
            Entry::Vacant(slot) => {
                slot.insert(vote.id);
            }
        }
        tables.votes.insert(vote.id, vote.clone());
        Ok(vote)
    }

    async fn vote_by_voter(&self, voter: Id, election: Id) -> Result<Option<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ballots
            .get(&(voter, election))
            .and_then(|id| tables.votes.get(id))
            .cloned())
    }

    async fn votes_by_voter(&self, voter: Id) -> Result<Vec<Vote>> {
        let tables = self.tables.lock().await;
        let mut votes: Vec<Vote> = tables
            .votes
            .values()
            .filter(|v| v.voter == voter)
            .cloned()
            .collect();
        votes.sort_by(|a, b| b.cast_at.cmp(&a.cast_at));
        Ok(votes)
    }

    async fn votes_in_election(&self, election: Id) -> Result<Vec<Vote>> {
        let tables = self.tables.lock().await;
        let mut votes: Vec<Vote> = tables
            .votes
            .values()
            .filter(|v| v.election == election)
            .cloned()
            .collect();
        votes.sort_by(|a, b| b.cast_at.cmp(&a.cast_at));
        Ok(votes)
    }

    async fn tally(&self, election: Id) -> Result<Vec<CandidateCount>> {
        let tables = self.tables.lock().await;
        let mut counts: HashMap<Id, u64> = HashMap::new();
        for vote in tables.votes.values().filter(|v| v.election == election) {
            *counts.entry(vote.candidate).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(candidate, votes)| CandidateCount { candidate, votes })
            .collect())
    }

}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::common::party::PartyLevel;

    fn vote(voter: Id, election: Id, candidate: Id) -> NewVote {
        NewVote {
            voter,
            candidate,
            election,
            cast_at: Utc::now(),
        }
    }

    #[rocket::async_test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::default();
        store
            .insert_account(NewAccount::pending_example())
            .await
            .unwrap();
        let result = store.insert_account(NewAccount::pending_example()).await;
        assert!(matches!(result, Err(Error::DuplicateIdentity(_))));
    }

    /// A new election with one candidate standing for `party`.
    async fn election_with_candidate(store: &MemoryStore, party: Id) -> (Id, Id) {
        let election = store
            .insert_election(NewElection::new(ElectionDetails::current_example()))
            .await
            .unwrap();
        let candidate = store
            .insert_candidate(NewCandidate {
                name: "Meera Nair".to_string(),
                party,
                election: election.id,
            })
            .await
            .unwrap();
        (election.id, candidate.id)
    }

    async fn voter_and_party(store: &MemoryStore) -> (Id, Id) {
        let voter = store
            .insert_account(NewAccount::approved_example())
            .await
            .unwrap();
        let party = store.insert_party(NewParty::example()).await.unwrap();
        (voter.id, party.id)
    }

    #[rocket::async_test]
    async fn second_vote_in_same_election_is_rejected() {
        let store = MemoryStore::default();
        let (voter, party) = voter_and_party(&store).await;
        let (election, candidate) = election_with_candidate(&store, party).await;
        store
            .insert_vote(vote(voter, election, candidate))
            .await
            .unwrap();

        let result = store.insert_vote(vote(voter, election, candidate)).await;
        assert!(matches!(result, Err(Error::DuplicateVote)));

        // Other elections are unaffected.
        let (other, rival) = election_with_candidate(&store, party).await;
        store.insert_vote(vote(voter, other, rival)).await.unwrap();
        assert_eq!(store.votes_by_voter(voter).await.unwrap().len(), 2);
    }

    #[rocket::async_test]
    async fn vote_must_refer_to_live_records() {
        let store = MemoryStore::default();
        let (voter, party) = voter_and_party(&store).await;
        let (election, candidate) = election_with_candidate(&store, party).await;
        let (other, rival) = election_with_candidate(&store, party).await;

        // A candidate from another election.
        let result = store.insert_vote(vote(voter, election, rival)).await;
        assert!(matches!(result, Err(Error::CandidateNotInElection)));

        // An unknown voter.
        let result = store.insert_vote(vote(Id::new(), election, candidate)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        // The election is deleted after the caller checked it, but before the
        // vote is stored.
        assert!(store.delete_election(election).await.unwrap());
        let result = store.insert_vote(vote(voter, election, candidate)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(store.votes_in_election(election).await.unwrap().is_empty());

        // Likewise for the candidate.
        assert!(store.delete_candidate(rival).await.unwrap());
        let result = store.insert_vote(vote(voter, other, rival)).await;
        assert!(matches!(result, Err(Error::CandidateNotInElection)));
        assert!(store.votes_by_voter(voter).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn candidate_with_votes_is_not_deleted() {
        let store = MemoryStore::default();
        let (voter, party) = voter_and_party(&store).await;
        let (election, candidate) = election_with_candidate(&store, party).await;
        store
            .insert_vote(vote(voter, election, candidate))
            .await
            .unwrap();

        let result = store.delete_candidate(candidate).await;
        assert!(matches!(result, Err(Error::InUse(_))));
        assert!(store.candidate_by_id(candidate).await.unwrap().is_some());
        let listed = store.election_by_id(election).await.unwrap().unwrap();
        assert_eq!(listed.candidates, vec![candidate]);
    }

    #[rocket::async_test]
    async fn transition_only_applies_from_expected_states() {
        let store = MemoryStore::default();
        let account = store
            .insert_account(NewAccount::pending_example())
            .await
            .unwrap();

        let moved = store
            .transition(account.id, &[StatusKind::Rejected], ValidationStatus::Resubmitted)
            .await
            .unwrap();
        assert!(!moved);

        let moved = store
            .transition(account.id, &StatusKind::AWAITING_REVIEW, ValidationStatus::Approved)
            .await
            .unwrap();
        assert!(moved);
        let account = store.account_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(account.validation, ValidationStatus::Approved);
    }

    #[rocket::async_test]
    async fn duplicate_party_name_is_rejected() {
        let store = MemoryStore::default();
        let first = store.insert_party(NewParty::example()).await.unwrap();
        let second = store.insert_party(NewParty::example2()).await.unwrap();

        let result = store.insert_party(NewParty::example()).await;
        assert!(matches!(result, Err(Error::DuplicateParty(_))));

        // Renaming onto another party's name is also a conflict...
        let renamed = PartyCore {
            name: first.name.clone(),
            level: PartyLevel::Local,
            logo_url: None,
        };
        let result = store.update_party(second.id, renamed.clone()).await;
        assert!(matches!(result, Err(Error::DuplicateParty(_))));

        // ...but keeping your own name is fine.
        let updated = store.update_party(first.id, renamed).await.unwrap().unwrap();
        assert_eq!(updated.level, PartyLevel::Local);
    }
}
