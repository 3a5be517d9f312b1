use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        candidate::CandidateDescription, election::ElectionDescription, party::PartyDescription,
    },
    db::{account::Account, election::Election, party::Party},
    mongodb::Id,
};
use crate::store::Store;

/// Every party, keyed by ID.
pub async fn parties_by_id(store: &Store) -> Result<HashMap<Id, Party>> {
    Ok(store
        .parties()
        .await?
        .into_iter()
        .map(|party| (party.id, party))
        .collect())
}

pub async fn election_by_id(store: &Store, id: Id) -> Result<Election> {
    store
        .election_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))
}

pub async fn account_by_id(store: &Store, id: Id) -> Result<Account> {
    store
        .account_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Account {id}")))
}

/// Describe an election with its candidates in ballot order.
pub async fn describe_election(
    store: &Store,
    election: Election,
    parties: &HashMap<Id, Party>,
    now: DateTime<Utc>,
) -> Result<ElectionDescription> {
    let mut candidates = store.candidates_in_election(election.id).await?;
    candidates.sort_by_key(|candidate| {
        election
            .candidates
            .iter()
            .position(|id| *id == candidate.id)
            .unwrap_or(usize::MAX)
    });
    let candidates = candidates
        .into_iter()
        .map(|candidate| {
            let party = parties.get(&candidate.party).cloned();
            CandidateDescription::new(candidate, party)
        })
        .collect();
    Ok(ElectionDescription::new(election, candidates, now))
}

/// Look up a party's description by ID in a prefetched map.
pub fn party_description(parties: &HashMap<Id, Party>, id: Id) -> Option<PartyDescription> {
    parties.get(&id).cloned().map(PartyDescription::from)
}

#[cfg(test)]
pub mod examples {
    use super::*;
    use crate::model::db::{
        candidate::{Candidate, NewCandidate},
        election::{ElectionDetails, NewElection},
        party::PartyCore,
    };

    /// An election with one candidate from each example party.
    pub struct Ballot {
        pub election: Election,
        pub parties: Vec<Party>,
        pub candidates: Vec<Candidate>,
    }

    pub async fn ballot(store: &Store, details: ElectionDetails) -> Ballot {
        let election = store
            .insert_election(NewElection::new(details))
            .await
            .unwrap();
        let mut parties = Vec::new();
        let mut candidates = Vec::new();
        for (name, party) in [
            ("Meera Nair", PartyCore::example()),
            ("Arjun Rao", PartyCore::example2()),
        ] {
            let party = match store.insert_party(party.clone()).await {
                Ok(party) => party,
                // Already created for an earlier ballot in the same store.
                Err(_) => store
                    .parties()
                    .await
                    .unwrap()
                    .into_iter()
                    .find(|p| p.name == party.name)
                    .unwrap(),
            };
            let candidate = store
                .insert_candidate(NewCandidate {
                    name: name.to_string(),
                    party: party.id,
                    election: election.id,
                })
                .await
                .unwrap();
            parties.push(party);
            candidates.push(candidate);
        }
        let election = election_by_id(store, election.id).await.unwrap();
        Ballot {
            election,
            parties,
            candidates,
        }
    }
}
