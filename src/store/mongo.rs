use mongodb::{
    bson::{doc, from_document, to_document, Bson, Document},
    error::TRANSIENT_TRANSACTION_ERROR,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

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
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id, MongoCollection},
};

use super::{AccountRepo, CandidateRepo, ElectionRepo, PartyRepo, VoteRepo};

/// A store backed by a MongoDB database.
///
/// Multi-document operations run in transactions, so the server must be part
/// of a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect to the given database and make sure its indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self { client, db })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    /// One attempt at storing a vote, in its own transaction.
    async fn try_insert_vote(&self, vote: &Vote, session: &mut ClientSession) -> Result<()> {
        session.start_transaction(None).await?;
        match self.insert_vote_with_session(vote, session).await {
            Ok(()) => Ok(session.commit_transaction().await?),
            Err(err) => {
                session.abort_transaction().await?;
                Err(err)
            }
        }
    }

    /// Check and touch everything the vote refers to, then insert it.
    ///
    /// The candidate and the voter both get their `ballots_cast` counter bumped,
    /// so a concurrent delete of either one (or of the election, which deletes
    /// its candidates) conflicts with this transaction.
    async fn insert_vote_with_session(
        &self,
        vote: &Vote,
        session: &mut ClientSession,
    ) -> Result<()> {
        let election = self
            .coll::<Election>()
            .find_one_with_session(vote.election.as_doc(), None, session)
            .await?;
        if election.is_none() {
            return Err(Error::not_found(format!("Election {}", vote.election)));
        }

        let bump = doc! { "$inc": { "ballots_cast": 1 } };
        let filter = doc! { "_id": vote.candidate, "election": vote.election };
        let matched = self
            .coll::<Candidate>()
            .update_one_with_session(filter, bump.clone(), None, session)
            .await?
            .matched_count;
        if matched == 0 {
            return Err(Error::CandidateNotInElection);
        }
        let matched = self
            .coll::<Account>()
            .update_one_with_session(vote.voter.as_doc(), bump, None, session)
            .await?
            .matched_count;
        if matched == 0 {
            return Err(Error::not_found(format!("Account {}", vote.voter)));
        }

        match self
            .coll::<Vote>()
            .insert_one_with_session(vote, None, session)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::DuplicateVote),
            Err(err) => Err(err.into()),
        }
    }
}

/// Build an update that sets every field of `fields`, and unsets any of the
/// `optional` fields that were skipped during serialisation.
fn overwrite(fields: Document, optional: &[&str]) -> Document {
    let unset: Document = optional
        .iter()
        .filter(|key| !fields.contains_key(key))
        .map(|key| (key.to_string(), Bson::String(String::new())))
        .collect();
    let mut update = doc! { "$set": fields };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    update
}

fn return_updated() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

fn sorted_by(sort: Document) -> FindOptions {
    FindOptions::builder().sort(sort).build()
}

const PROFILE_OPTIONAL: &[&str] = &["photo_url"];

#[rocket::async_trait]
impl AccountRepo for MongoStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account> {
        let account = Account {
            id: Id::new(),
            account,
        };
        match self.coll::<Account>().insert_one(&account, None).await {
            Ok(_) => Ok(account),
            Err(err) if is_duplicate_key_error(&err) => {
                Err(Error::DuplicateIdentity(account.profile.email.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn account_by_id(&self, id: Id) -> Result<Option<Account>> {
        Ok(self.coll::<Account>().find_one(id.as_doc(), None).await?)
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let filter = doc! { "email": email };
        Ok(self.coll::<Account>().find_one(filter, None).await?)
    }

    async fn accounts(&self, status: Option<StatusKind>) -> Result<Vec<Account>> {
        let filter = status.map(|status| doc! { "validation.status": status });
        let accounts = self
            .coll::<Account>()
            .find(filter, sorted_by(doc! { "_id": 1 }))
            .await?
            .try_collect()
            .await?;
        Ok(accounts)
    }

    async fn transition(
        &self,
        id: Id,
        from: &[StatusKind],
        to: ValidationStatus,
    ) -> Result<bool> {
        let from: Vec<Bson> = from.iter().copied().map(Bson::from).collect();
        let filter = doc! {
            "_id": id,
            "validation.status": { "$in": from },
        };
        let update = doc! { "$set": { "validation": &to } };
        let result = self
            .coll::<Account>()
            .update_one(filter, update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn resubmit_account(
        &self,
        id: Id,
        profile: Profile,
        password_hash: Option<String>,
    ) -> Result<bool> {
        let mut fields = to_document(&profile)?;
        fields.insert("validation", &ValidationStatus::Resubmitted);
        if let Some(hash) = password_hash {
            fields.insert("password_hash", hash);
        }
        let filter = doc! {
            "_id": id,
            "validation.status": StatusKind::Rejected,
        };
        match self
            .coll::<Account>()
            .update_one(filter, overwrite(fields, PROFILE_OPTIONAL), None)
            .await
        {
            Ok(result) => Ok(result.matched_count == 1),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::DuplicateIdentity(profile.email)),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_profile(&self, id: Id, profile: Profile) -> Result<Option<Account>> {
        let update = overwrite(to_document(&profile)?, PROFILE_OPTIONAL);
        match self
            .coll::<Account>()
            .find_one_and_update(id.as_doc(), update, return_updated())
            .await
        {
            Ok(account) => Ok(account),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::DuplicateIdentity(profile.email)),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_account(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let deleted = self
            .coll::<Account>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?
            .deleted_count;
        if deleted == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        self.coll::<Vote>()
            .delete_many_with_session(doc! { "voter": id }, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn admin_exists(&self) -> Result<bool> {
        let filter = doc! { "role": Role::Admin };
        Ok(self.coll::<Account>().find_one(filter, None).await?.is_some())
    }
}

#[rocket::async_trait]
impl ElectionRepo for MongoStore {
    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let election = Election {
            id: Id::new(),
            election,
        };
        self.coll::<Election>().insert_one(&election, None).await?;
        Ok(election)
    }

    async fn election_by_id(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.coll::<Election>().find_one(id.as_doc(), None).await?)
    }

    async fn elections(&self) -> Result<Vec<Election>> {
        let elections = self
            .coll::<Election>()
            .find(None, sorted_by(doc! { "start_time": -1 }))
            .await?
            .try_collect()
            .await?;
        Ok(elections)
    }

    async fn update_election(
        &self,
        id: Id,
        details: ElectionDetails,
    ) -> Result<Option<Election>> {
        let update = overwrite(to_document(&details)?, &["state", "city"]);
        Ok(self
            .coll::<Election>()
            .find_one_and_update(id.as_doc(), update, return_updated())
            .await?)
    }

    async fn set_results_declared(&self, id: Id, declared: bool) -> Result<bool> {
        let update = doc! { "$set": { "results_declared": declared } };
        let result = self
            .coll::<Election>()
            .update_one(id.as_doc(), update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let deleted = self
            .coll::<Election>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?
            .deleted_count;
        if deleted == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        let filter = doc! { "election": id };
        self.coll::<Candidate>()
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.coll::<Vote>()
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }
}

#[rocket::async_trait]
impl CandidateRepo for MongoStore {
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };

        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let update = doc! { "$push": { "candidates": candidate.id } };
        let matched = self
            .coll::<Election>()
            .update_one_with_session(candidate.election.as_doc(), update, None, &mut session)
            .await?
            .matched_count;
        if matched == 0 {
            session.abort_transaction().await?;
            return Err(Error::not_found(format!("Election {}", candidate.election)));
        }
        self.coll::<Candidate>()
            .insert_one_with_session(&candidate, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(candidate)
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.coll::<Candidate>().find_one(id.as_doc(), None).await?)
    }

    async fn candidates_in_election(&self, election: Id) -> Result<Vec<Candidate>> {
        let order = match self.election_by_id(election).await? {
            Some(election) => election.election.candidates,
            None => return Ok(Vec::new()),
        };
        let mut found: Vec<Candidate> = self
            .coll::<Candidate>()
            .find(doc! { "election": election }, None)
            .await?
            .try_collect()
            .await?;
        // Keep the election's own ordering.
        found.sort_by_key(|c| order.iter().position(|id| *id == c.id));
        Ok(found)
    }

    async fn update_candidate(
        &self,
        id: Id,
        name: String,
        party: Id,
    ) -> Result<Option<Candidate>> {
        let update = doc! { "$set": { "name": name, "party": party } };
        Ok(self
            .coll::<Candidate>()
            .find_one_and_update(id.as_doc(), update, return_updated())
            .await?)
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let candidate = self
            .coll::<Candidate>()
            .find_one_and_delete_with_session(id.as_doc(), None, &mut session)
            .await?;
        let candidate = match candidate {
            Some(candidate) => candidate,
            None => {
                session.abort_transaction().await?;
                return Ok(false);
            }
        };
        // Any vote cast after this snapshot bumped the candidate, so the delete
        // above conflicts with it.
        let voted = self
            .coll::<Vote>()
            .find_one_with_session(doc! { "candidate": id }, None, &mut session)
            .await?;
        if voted.is_some() {
            session.abort_transaction().await?;
            return Err(Error::InUse(format!("Candidate {id} has received votes")));
        }
        let update = doc! { "$pull": { "candidates": id } };
        self.coll::<Election>()
            .update_one_with_session(candidate.election.as_doc(), update, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn party_in_use(&self, party: Id) -> Result<bool> {
        let filter = doc! { "party": party };
        Ok(self
            .coll::<Candidate>()
            .find_one(filter, None)
            .await?
            .is_some())
    }
}

#[rocket::async_trait]
impl PartyRepo for MongoStore {
    async fn insert_party(&self, party: NewParty) -> Result<Party> {
        let party = Party {
            id: Id::new(),
            party,
        };
        match self.coll::<Party>().insert_one(&party, None).await {
            Ok(_) => Ok(party),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::DuplicateParty(party.name.clone())),
            Err(err) => Err(err.into()),
        }
    }

    async fn party_by_id(&self, id: Id) -> Result<Option<Party>> {
        Ok(self.coll::<Party>().find_one(id.as_doc(), None).await?)
    }

    async fn parties(&self) -> Result<Vec<Party>> {
        let parties = self
            .coll::<Party>()
            .find(None, sorted_by(doc! { "name": 1 }))
            .await?
            .try_collect()
            .await?;
        Ok(parties)
    }

    async fn update_party(&self, id: Id, party: PartyCore) -> Result<Option<Party>> {
        let update = overwrite(to_document(&party)?, &["logo_url"]);
        match self
            .coll::<Party>()
            .find_one_and_update(id.as_doc(), update, return_updated())
            .await
        {
            Ok(party) => Ok(party),
            Err(err) if is_duplicate_key_error(&err) => Err(Error::DuplicateParty(party.name)),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_party(&self, id: Id) -> Result<bool> {
        let result = self.coll::<Party>().delete_one(id.as_doc(), None).await?;
        Ok(result.deleted_count == 1)
    }
}

#[rocket::async_trait]
impl VoteRepo for MongoStore {
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        let mut session = self.client.start_session(None).await?;
        // The unique (voter, election) index settles concurrent attempts by the
        // same voter. Write conflicts with other transactions are retried, and
        // the retry sees whatever the winner committed.
        loop {
            match self.try_insert_vote(&vote, &mut session).await {
                Err(Error::Db(err)) if err.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                    debug!("Retrying vote {} after a write conflict", vote.id);
                }
                result => return result.map(|()| vote),
            }
        }
    }

    async fn vote_by_voter(&self, voter: Id, election: Id) -> Result<Option<Vote>> {
        let filter = doc! { "voter": voter, "election": election };
        Ok(self.coll::<Vote>().find_one(filter, None).await?)
    }

    async fn votes_by_voter(&self, voter: Id) -> Result<Vec<Vote>> {
        let votes = self
            .coll::<Vote>()
            .find(doc! { "voter": voter }, sorted_by(doc! { "cast_at": -1 }))
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    async fn votes_in_election(&self, election: Id) -> Result<Vec<Vote>> {
        let votes = self
            .coll::<Vote>()
            .find(doc! { "election": election }, sorted_by(doc! { "cast_at": -1 }))
            .await?
            .try_collect()
            .await?;
        Ok(votes)
    }

    async fn tally(&self, election: Id) -> Result<Vec<CandidateCount>> {
        let pipeline = vec![
            doc! { "$match": { "election": election } },
            doc! { "$group": { "_id": "$candidate", "votes": { "$sum": 1 } } },
        ];
        let groups: Vec<Document> = self
            .coll::<Vote>()
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;
        let counts: Vec<CandidateCount> = groups
            .into_iter()
            .map(from_document)
            .collect::<std::result::Result<_, _>>()?;
        Ok(counts)
    }

}
