use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    account::{Account, NewAccount},
    candidate::{Candidate, NewCandidate},
    election::{Election, NewElection},
    party::{NewParty, Party},
    vote::{NewVote, Vote},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Account collections
const ACCOUNTS: &str = "accounts";
impl MongoCollection for Account {
    const NAME: &'static str = ACCOUNTS;
}
impl MongoCollection for NewAccount {
    const NAME: &'static str = ACCOUNTS;
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Party collections
const PARTIES: &str = "parties";
impl MongoCollection for Party {
    const NAME: &'static str = PARTIES;
}
impl MongoCollection for NewParty {
    const NAME: &'static str = PARTIES;
}

// Vote collections
const VOTES: &str = "votes";
impl MongoCollection for Vote {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewVote {
    const NAME: &'static str = VOTES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique indexes here are what enforce email uniqueness, party name
/// uniqueness, and one vote per voter per election.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Account collection.
    let account_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Account>::from_db(db)
        .create_index(account_index, None)
        .await?;

    // Party collection.
    let party_index = IndexModel::builder()
        .keys(doc! {"name": 1})
        .options(unique.clone())
        .build();
    Coll::<Party>::from_db(db)
        .create_index(party_index, None)
        .await?;

    // Candidate collection: looked up by election and by party.
    let candidate_indexes = vec![
        IndexModel::builder().keys(doc! {"election": 1}).build(),
        IndexModel::builder().keys(doc! {"party": 1}).build(),
    ];
    Coll::<Candidate>::from_db(db)
        .create_indexes(candidate_indexes, None)
        .await?;

    // Vote collection.
    let vote_index = IndexModel::builder()
        .keys(doc! {"voter": 1, "election": 1})
        .options(unique)
        .build();
    let tally_index = IndexModel::builder()
        .keys(doc! {"election": 1, "candidate": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_indexes(vec![vote_index, tally_index], None)
        .await?;

    Ok(())
}
