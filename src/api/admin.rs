use chrono::Utc;
use rocket::{response::status::Created, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            account::{AccountDescription, RejectionRequest},
            auth::{Admin, AuthToken},
            candidate::{CandidateDescription, CandidateSpec, CandidateUpdate},
            election::{ElectionDescription, ElectionSpec},
            vote::{AdminElectionResults, ElectionResults, VoterRecord},
        },
        common::account::StatusKind,
        mongodb::Id,
    },
    service::{catalogue, registration, voting},
    store::Store,
};

use super::common::{account_by_id, describe_election, parties_by_id, party_description};

pub fn routes() -> Vec<Route> {
    routes![
        get_accounts,
        get_account,
        approve_account,
        reject_account,
        delete_account,
        create_election,
        update_election,
        delete_election,
        declare_results,
        retract_results,
        get_detailed_results,
        create_candidate,
        update_candidate,
        delete_candidate,
    ]
}

/// All accounts, or only those with the given validation status.
#[get("/admin/accounts?<status>")]
async fn get_accounts(
    _token: AuthToken<Admin>,
    status: Option<StatusKind>,
    store: Store,
) -> Result<Json<Vec<AccountDescription>>> {
    let accounts = store.accounts(status).await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

#[get("/admin/accounts/<account_id>")]
async fn get_account(
    _token: AuthToken<Admin>,
    account_id: Id,
    store: Store,
) -> Result<Json<AccountDescription>> {
    Ok(Json(account_by_id(&store, account_id).await?.into()))
}

#[post("/admin/accounts/<account_id>/approve")]
async fn approve_account(
    _token: AuthToken<Admin>,
    account_id: Id,
    store: Store,
) -> Result<Json<AccountDescription>> {
    let account = registration::approve(&*store, account_id).await?;
    Ok(Json(account.into()))
}

#[post("/admin/accounts/<account_id>/reject", data = "<rejection>", format = "json")]
async fn reject_account(
    _token: AuthToken<Admin>,
    account_id: Id,
    rejection: Json<RejectionRequest>,
    store: Store,
) -> Result<Json<AccountDescription>> {
    let account = registration::reject(&*store, account_id, &rejection.reason).await?;
    Ok(Json(account.into()))
}

#[delete("/admin/accounts/<account_id>")]
async fn delete_account(token: AuthToken<Admin>, account_id: Id, store: Store) -> Result<()> {
    if token.id == account_id {
        return Err(Error::Forbidden(
            "Admins cannot delete their own account".to_string(),
        ));
    }
    registration::delete_account(&*store, account_id).await
}

#[post("/admin/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    store: Store,
) -> Result<Created<Json<ElectionDescription>>> {
    let election = catalogue::create_election(&*store, spec.0.try_into()?).await?;
    let location = format!("/elections/{}", election.id);
    let description = ElectionDescription::new(election, Vec::new(), Utc::now());
    Ok(Created::new(location).body(Json(description)))
}

#[put("/admin/elections/<election_id>", data = "<spec>", format = "json")]
async fn update_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    spec: Json<ElectionSpec>,
    store: Store,
) -> Result<Json<ElectionDescription>> {
    let election = catalogue::update_election(&*store, election_id, spec.0.try_into()?).await?;
    let parties = parties_by_id(&store).await?;
    let description = describe_election(&store, election, &parties, Utc::now()).await?;
    Ok(Json(description))
}

/// Delete an election along with its candidates and every vote cast in it.
#[delete("/admin/elections/<election_id>")]
async fn delete_election(_token: AuthToken<Admin>, election_id: Id, store: Store) -> Result<()> {
    catalogue::delete_election(&*store, election_id).await
}

#[post("/admin/elections/<election_id>/declare")]
async fn declare_results(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: Store,
) -> Result<Json<ElectionDescription>> {
    set_declared(&store, election_id, true).await
}

#[delete("/admin/elections/<election_id>/declare")]
async fn retract_results(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: Store,
) -> Result<Json<ElectionDescription>> {
    set_declared(&store, election_id, false).await
}

async fn set_declared(
    store: &Store,
    election_id: Id,
    declared: bool,
) -> Result<Json<ElectionDescription>> {
    let now = Utc::now();
    let election = catalogue::declare_results(&**store, election_id, declared, now).await?;
    let parties = parties_by_id(store).await?;
    Ok(Json(describe_election(store, election, &parties, now).await?))
}

/// Results plus who voted for whom, available before the declaration.
#[get("/admin/elections/<election_id>/results")]
async fn get_detailed_results(
    _token: AuthToken<Admin>,
    election_id: Id,
    store: Store,
) -> Result<Json<AdminElectionResults>> {
    let tally = voting::results(&*store, election_id, true).await?;
    let parties = parties_by_id(&store).await?;
    let results = ElectionResults::new(tally, |party| party_description(&parties, party));

    let mut voters = Vec::new();
    for vote in store.votes_in_election(election_id).await? {
        let account = store.account_by_id(vote.voter).await?;
        voters.push(VoterRecord {
            voter: vote.voter.into(),
            name: account.as_ref().map(|a| a.profile.name.clone()),
            email: account.map(|a| a.account.profile.email),
            candidate: vote.candidate.into(),
            cast_at: vote.cast_at,
        });
    }

    Ok(Json(AdminElectionResults { results, voters }))
}

#[post("/admin/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    spec: Json<CandidateSpec>,
    store: Store,
) -> Result<Created<Json<CandidateDescription>>> {
    let candidate = catalogue::create_candidate(&*store, spec.0.try_into()?).await?;
    let party = store.party_by_id(candidate.party).await?;
    let location = format!("/elections/{}", candidate.election);
    Ok(Created::new(location).body(Json(CandidateDescription::new(candidate, party))))
}

#[put("/admin/candidates/<candidate_id>", data = "<update>", format = "json")]
async fn update_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    update: Json<CandidateUpdate>,
    store: Store,
) -> Result<Json<CandidateDescription>> {
    let (name, party) = update.0.validate()?;
    let candidate = catalogue::update_candidate(&*store, candidate_id, name, *party).await?;
    let party = store.party_by_id(candidate.party).await?;
    Ok(Json(CandidateDescription::new(candidate, party)))
}

#[delete("/admin/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    candidate_id: Id,
    store: Store,
) -> Result<()> {
    catalogue::delete_candidate(&*store, candidate_id).await
}
