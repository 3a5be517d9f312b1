use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{Admin, AuthToken},
            election::ElectionDescription,
            vote::ElectionResults,
        },
        mongodb::Id,
    },
    service::voting,
    store::Store,
};

use super::common::{describe_election, election_by_id, parties_by_id, party_description};

pub fn routes() -> Vec<Route> {
    routes![get_elections, get_election, get_results]
}

#[get("/elections")]
async fn get_elections(store: Store) -> Result<Json<Vec<ElectionDescription>>> {
    let now = Utc::now();
    let parties = parties_by_id(&store).await?;
    let mut descriptions = Vec::new();
    for election in store.elections().await? {
        descriptions.push(describe_election(&store, election, &parties, now).await?);
    }
    Ok(Json(descriptions))
}

#[get("/elections/<election_id>")]
async fn get_election(election_id: Id, store: Store) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(&store, election_id).await?;
    let parties = parties_by_id(&store).await?;
    let description = describe_election(&store, election, &parties, Utc::now()).await?;
    Ok(Json(description))
}

/// Anyone may see declared results. Admins see them as soon as votes exist.
#[get("/elections/<election_id>/results")]
async fn get_results(
    election_id: Id,
    token: Option<AuthToken<Admin>>,
    store: Store,
) -> Result<Json<ElectionResults>> {
    let tally = voting::results(&*store, election_id, token.is_some()).await?;
    let parties = parties_by_id(&store).await?;
    Ok(Json(ElectionResults::new(tally, |party| {
        party_description(&parties, party)
    })))
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client, serde::json::Value};

    use crate::api::common::examples::ballot;
    use crate::model::{
        common::election::WindowState,
        db::{
            account::{AccountCore, Profile},
            election::ElectionDetails,
            vote::NewVote,
        },
    };

    use super::*;

    #[backend_test]
    async fn elections_are_listed_with_candidates(client: Client, store: Store) {
        let current = ballot(&store, ElectionDetails::current_example()).await;
        ballot(&store, ElectionDetails::future_example()).await;

        let response = client.get(uri!(get_elections)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let elections: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(elections.len(), 2);

        let listed = elections
            .iter()
            .find(|e| *e.id == current.election.id)
            .unwrap();
        assert_eq!(listed.window, WindowState::Active);
        assert_eq!(listed.candidates.len(), 2);
        assert_eq!(listed.candidates[0].name, "Meera Nair");
        let party = listed.candidates[0].party.as_ref().unwrap();
        assert_eq!(party.name, current.parties[0].name);
    }

    #[backend_test]
    async fn get_one_election(client: Client, store: Store) {
        let future = ballot(&store, ElectionDetails::future_example()).await;

        let response = client
            .get(uri!(get_election(future.election.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let election: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(election.window, WindowState::Upcoming);
        assert_eq!(election.city.as_deref(), Some("Pune"));

        let response = client.get(uri!(get_election(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn malformed_id_is_not_found(client: Client) {
        let response = client.get("/elections/not-an-id").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "not_found");
    }

    async fn vote_once(store: &Store) -> Id {
        let past = ballot(store, ElectionDetails::past_example()).await;
        let voter = AccountCore {
            profile: Profile::example2(),
            ..AccountCore::approved_example()
        };
        let voter = store.insert_account(voter).await.unwrap();
        store
            .insert_vote(NewVote {
                voter: voter.id,
                candidate: past.candidates[1].id,
                election: past.election.id,
                cast_at: Utc::now(),
            })
            .await
            .unwrap();
        past.election.id
    }

    #[backend_test]
    async fn undeclared_results_are_hidden(client: Client, store: Store) {
        let election = vote_once(&store).await;

        let response = client.get(uri!(get_results(election))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "results_not_declared");

        store.set_results_declared(election, true).await.unwrap();
        let response = client.get(uri!(get_results(election))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert!(results.results_declared);
        assert_eq!(results.total_votes, 1);
        assert_eq!(results.tallies[0].name, "Arjun Rao");
        assert_eq!(results.tallies[0].votes, 1);
        assert_eq!(results.tallies[1].votes, 0);
    }

    #[backend_test(admin)]
    async fn admins_see_undeclared_results(client: Client, store: Store) {
        let election = vote_once(&store).await;

        let response = client.get(uri!(get_results(election))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert!(!results.results_declared);
        assert_eq!(results.total_votes, 1);
    }

    #[backend_test(voter)]
    async fn voters_wait_for_declaration(client: Client, store: Store) {
        let election = vote_once(&store).await;

        let response = client.get(uri!(get_results(election))).dispatch().await;
        assert_eq!(Status::Forbidden, response.status());
    }
}
