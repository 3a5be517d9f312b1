//! Persistence behind one async trait per entity.
//!
//! Route handlers and the voting/registration logic only ever see these traits.
//! Two implementations exist: [`MongoStore`] for deployments and
//! [`MemoryStore`] for tests and local development. Both must uphold the
//! uniqueness constraints listed on each trait; the voting logic relies on them
//! rather than on its own pre-checks.

use std::{ops::Deref, sync::Arc};

use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    common::account::{StatusKind, ValidationStatus},
    db::{
        account::{Account, NewAccount, Profile},
        candidate::{Candidate, NewCandidate},
        election::{Election, ElectionDetails, NewElection},
        party::{NewParty, Party, PartyCore},
        vote::{CandidateCount, NewVote, Vote},
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Accounts. Emails are unique.
#[rocket::async_trait]
pub trait AccountRepo: Send + Sync {
    /// Fails with `DuplicateIdentity` if the email is taken.
    async fn insert_account(&self, account: NewAccount) -> Result<Account>;

    async fn account_by_id(&self, id: Id) -> Result<Option<Account>>;

    /// `email` must already be normalised.
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// All accounts, optionally only those with the given status.
    async fn accounts(&self, status: Option<StatusKind>) -> Result<Vec<Account>>;

    /// Atomically set the validation status, but only if the current status is
    /// one of `from`. Returns whether the account was updated.
    async fn transition(&self, id: Id, from: &[StatusKind], to: ValidationStatus)
        -> Result<bool>;

    /// Atomically overwrite the profile (and optionally the password hash) and
    /// mark the account resubmitted, but only if it is currently rejected.
    /// Returns whether the account was updated.
    async fn resubmit_account(
        &self,
        id: Id,
        profile: Profile,
        password_hash: Option<String>,
    ) -> Result<bool>;

    /// Replace the profile without touching the validation status.
    /// Fails with `DuplicateIdentity` if the new email is taken.
    async fn update_profile(&self, id: Id, profile: Profile) -> Result<Option<Account>>;

    /// Delete the account and every vote it cast. Returns whether it existed.
    async fn delete_account(&self, id: Id) -> Result<bool>;

    async fn admin_exists(&self) -> Result<bool>;
}

/// Elections.
#[rocket::async_trait]
pub trait ElectionRepo: Send + Sync {
    async fn insert_election(&self, election: NewElection) -> Result<Election>;

    async fn election_by_id(&self, id: Id) -> Result<Option<Election>>;

    /// All elections, latest start first.
    async fn elections(&self) -> Result<Vec<Election>>;

    /// Replace the admin-editable details, keeping candidates and declaration.
    async fn update_election(&self, id: Id, details: ElectionDetails)
        -> Result<Option<Election>>;

    /// Returns whether the election exists.
    async fn set_results_declared(&self, id: Id, declared: bool) -> Result<bool>;

    /// Delete the election with all its candidates and votes.
    /// Returns whether it existed.
    async fn delete_election(&self, id: Id) -> Result<bool>;
}

/// Candidates. Each belongs to exactly one election and is listed in it.
#[rocket::async_trait]
pub trait CandidateRepo: Send + Sync {
    /// Insert the candidate and append it to its election's list.
    /// Fails with `NotFound` if the election does not exist.
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>>;

    async fn candidates_in_election(&self, election: Id) -> Result<Vec<Candidate>>;

    /// Change name and party; the owning election never changes.
    async fn update_candidate(&self, id: Id, name: String, party: Id)
        -> Result<Option<Candidate>>;

    /// Delete the candidate and detach it from its election.
    /// Returns whether it existed. Fails with `InUse` if the candidate has
    /// received votes.
    async fn delete_candidate(&self, id: Id) -> Result<bool>;

    /// Does any candidate stand for this party?
    async fn party_in_use(&self, party: Id) -> Result<bool>;
}

/// Parties. Names are unique.
#[rocket::async_trait]
pub trait PartyRepo: Send + Sync {
    /// Fails with `DuplicateParty` if the name is taken.
    async fn insert_party(&self, party: NewParty) -> Result<Party>;

    async fn party_by_id(&self, id: Id) -> Result<Option<Party>>;

    async fn parties(&self) -> Result<Vec<Party>>;

    /// Fails with `DuplicateParty` if the new name is taken.
    async fn update_party(&self, id: Id, party: PartyCore) -> Result<Option<Party>>;

    async fn delete_party(&self, id: Id) -> Result<bool>;
}

/// Votes. At most one per (voter, election), enforced by the store itself.
#[rocket::async_trait]
pub trait VoteRepo: Send + Sync {
    /// Fails with `DuplicateVote` if the voter already has a vote in the
    /// election, including when a concurrent insert won the race.
    ///
    /// The election, the candidate and the voter are checked in the same atomic
    /// step as the insert: `NotFound` if the election or voter is gone, and
    /// `CandidateNotInElection` if the candidate no longer stands in it.
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote>;

    async fn vote_by_voter(&self, voter: Id, election: Id) -> Result<Option<Vote>>;

    async fn votes_by_voter(&self, voter: Id) -> Result<Vec<Vote>>;

    /// Newest first.
    async fn votes_in_election(&self, election: Id) -> Result<Vec<Vote>>;

    /// Vote counts per candidate that received at least one vote.
    async fn tally(&self, election: Id) -> Result<Vec<CandidateCount>>;
}

/// Everything the server needs from persistence.
pub trait Repository: AccountRepo + ElectionRepo + CandidateRepo + PartyRepo + VoteRepo {}

impl<T> Repository for T where T: AccountRepo + ElectionRepo + CandidateRepo + PartyRepo + VoteRepo
{}

/// A shared handle on the configured repository. This is managed state, and
/// can also be requested directly as a request guard.
#[derive(Clone)]
pub struct Store(Arc<dyn Repository>);

impl Store {
    pub fn new(repository: impl Repository + 'static) -> Self {
        Self(Arc::new(repository))
    }

    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }
}

impl Deref for Store {
    type Target = dyn Repository;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Panics iff the [`Store`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<Store>>().await.unwrap();
        request::Outcome::Success(store.inner().clone())
    }
}
