use chrono::Utc;
use rocket::{
    http::{Cookie, CookieJar},
    response::status::Created,
    serde::json::Json,
    Route,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            account::{AccountDescription, ProfileSpec},
            auth::{AuthToken, Voter, AUTH_TOKEN_COOKIE},
            candidate::CandidateDescription,
            id::ApiId,
            vote::{VoteDetails, VoteReceipt, VoteRequest},
        },
        mongodb::Id,
    },
    service::{registration, voting},
    store::Store,
};

use super::common::{account_by_id, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![
        cast_vote,
        get_profile,
        update_profile,
        delete_profile,
        get_votes,
        get_vote,
    ]
}

#[post("/elections/<election_id>/vote", data = "<vote>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    vote: Json<VoteRequest>,
    store: Store,
) -> Result<Created<Json<VoteReceipt>>> {
    let candidate = *vote.candidate;
    let vote = voting::cast_vote(&*store, token.id, election_id, candidate, Utc::now()).await?;
    let location = format!("/voter/votes/{election_id}");
    Ok(Created::new(location).body(Json(vote.into())))
}

#[get("/voter/profile")]
async fn get_profile(token: AuthToken<Voter>, store: Store) -> Result<Json<AccountDescription>> {
    let account = account_by_id(&store, token.id).await?;
    Ok(Json(account.into()))
}

#[put("/voter/profile", data = "<profile>", format = "json")]
async fn update_profile(
    token: AuthToken<Voter>,
    profile: Json<ProfileSpec>,
    store: Store,
) -> Result<Json<AccountDescription>> {
    let account = registration::update_profile(&*store, token.id, profile.0.try_into()?).await?;
    Ok(Json(account.into()))
}

/// Close the caller's account. Their votes go with it.
#[delete("/voter/profile")]
async fn delete_profile(
    token: AuthToken<Voter>,
    cookies: &CookieJar<'_>,
    store: Store,
) -> Result<()> {
    registration::delete_account(&*store, token.id).await?;
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Ok(())
}

/// The elections the caller has voted in.
#[get("/voter/votes")]
async fn get_votes(token: AuthToken<Voter>, store: Store) -> Result<Json<Vec<ApiId>>> {
    let votes = store.votes_by_voter(token.id).await?;
    Ok(Json(votes.into_iter().map(|vote| vote.election.into()).collect()))
}

#[get("/voter/votes/<election_id>")]
async fn get_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    store: Store,
) -> Result<Json<VoteDetails>> {
    let election = election_by_id(&store, election_id).await?;
    let vote = store
        .vote_by_voter(token.id, election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vote in election {election_id}")))?;
    let candidate = store
        .candidate_by_id(vote.candidate)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {}", vote.candidate)))?;
    let party = store.party_by_id(candidate.party).await?;

    Ok(Json(VoteDetails {
        election: election.id.into(),
        election_title: election.election.details.title,
        candidate: CandidateDescription::new(candidate, party),
        cast_at: vote.cast_at,
    }))
}
